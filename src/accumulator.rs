//! 流式回答累加模块
//!
//! `ChatAccumulator` 只在单次调用内使用，事件按到达顺序依次应用，
//! 不需要任何锁。
use crate::{
    error::{CozeError, Result},
    types::{ChatOutcome, StreamEvent},
};
use futures::{Stream, StreamExt};
use log::{debug, warn};

/// 应用一个事件之后的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// 继续等待后续事件
    Streaming,
    /// 已收到结束事件
    Done,
}

impl Progress {
    pub fn is_done(self) -> bool {
        self == Progress::Done
    }
}

/// 单次对话的累加状态
#[derive(Debug, Default)]
pub struct ChatAccumulator {
    full_content: String,
    follow_up_questions: Vec<String>,
    events: usize,
}

impl ChatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目前已知的完整回答
    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    pub fn follow_up_questions(&self) -> &[String] {
        &self.follow_up_questions
    }

    /// 已应用的事件数量
    pub fn events(&self) -> usize {
        self.events
    }

    /// 应用一个事件
    ///
    /// `on_update` 只会收到新增的文本片段，所有片段拼起来始终等于 `full_content`。
    pub fn apply<F>(&mut self, event: StreamEvent, on_update: &mut F) -> Progress
    where
        F: FnMut(&str),
    {
        self.events += 1;

        match event {
            StreamEvent::Delta(message) if message.is_answer() => {
                if !message.content.is_empty() {
                    self.full_content.push_str(&message.content);
                    on_update(&message.content);
                }
            }
            StreamEvent::Completed(message) if message.is_answer() => {
                self.reconcile(&message.content, on_update);
            }
            StreamEvent::Completed(message) if message.is_follow_up() => {
                self.follow_up_questions.push(message.content);
            }
            StreamEvent::Done => return Progress::Done,
            StreamEvent::Other { event } => debug!("Ignoring event: {}", event),
            StreamEvent::Delta(_) | StreamEvent::Completed(_) => {}
        }

        Progress::Streaming
    }

    /// 用服务端的完整回答补齐丢失的增量
    fn reconcile<F>(&mut self, authoritative: &str, on_update: &mut F)
    where
        F: FnMut(&str),
    {
        if authoritative == self.full_content {
            return;
        }
        if !authoritative.starts_with(self.full_content.as_str()) {
            warn!(
                "Completed answer does not extend streamed text ({} vs {} bytes), reconciling by length",
                authoritative.len(),
                self.full_content.len()
            );
        }

        match authoritative.get(self.full_content.len()..) {
            Some("") => {}
            Some(suffix) => {
                on_update(suffix);
                self.full_content.push_str(suffix);
            }
            None if authoritative.len() > self.full_content.len() => {
                warn!("Completed answer offset {} is not a char boundary", self.full_content.len());
            }
            None => {}
        }
    }

    /// 生成最终结果，消耗累加器
    pub fn into_outcome(self) -> ChatOutcome {
        ChatOutcome {
            content: self.full_content,
            follow_up_questions: self.follow_up_questions,
        }
    }
}

/// 依次消费事件直到 `done`
///
/// 返回完成时的累加器；事件流报错或在 `done` 前结束时返回错误。
pub(crate) async fn drive<S, F>(events: S, mut on_update: F) -> Result<ChatAccumulator>
where
    S: Stream<Item = Result<StreamEvent>>,
    F: FnMut(&str),
{
    let mut accumulator = ChatAccumulator::new();
    let mut events = std::pin::pin!(events);

    while let Some(event) = events.next().await {
        if accumulator.apply(event?, &mut on_update).is_done() {
            return Ok(accumulator);
        }
    }

    Err(CozeError::Incomplete)
}

/// 消费事件流，产出唯一的对话结果
///
/// 增量文本通过 `on_update` 实时回调。
pub async fn accumulate<S, F>(events: S, on_update: F) -> Result<ChatOutcome>
where
    S: Stream<Item = Result<StreamEvent>>,
    F: FnMut(&str),
{
    drive(events, on_update).await.map(ChatAccumulator::into_outcome)
}
