//! API 数据结构模块

use crate::error::{CozeError, Result};
use crate::stream::RawFrame;
use serde::{Deserialize, Serialize};

// ================================================================================================
// 事件名称
// ================================================================================================

/// 增量消息事件
pub const EVENT_MESSAGE_DELTA: &str = "conversation.message.delta";
/// 消息完成事件
pub const EVENT_MESSAGE_COMPLETED: &str = "conversation.message.completed";
/// 流结束事件
pub const EVENT_DONE: &str = "done";

// ================================================================================================
// API 请求结构
// ================================================================================================

/// 对话消息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    /// 角色
    pub role: Role,
    /// 内容
    pub content: String,
    /// 内容类型
    pub content_type: ContentType,
}

/// 角色枚举
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 用户
    User,
    /// 智能体
    Assistant,
    /// 其他角色，累加器会忽略
    #[default]
    #[serde(other)]
    Other,
}

/// 内容类型，目前只发送纯文本
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
}

/// `/v3/chat` 请求体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// 智能体 ID
    pub bot_id: String,
    /// 用户标识
    pub user_id: String,
    /// 是否流式返回
    pub stream: bool,
    /// 本轮追加的消息
    pub additional_messages: Vec<Message>,
}

// ================================================================================================
// 流式 API 响应结构
// ================================================================================================

/// 消息类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// 回答正文
    Answer,
    /// 推荐的追问
    FollowUp,
    /// verbose、function_call 等其他类型
    #[default]
    #[serde(other)]
    Other,
}

/// `delta` / `completed` 事件携带的消息数据
///
/// 所有字段都可缺省，缺失的字段按默认值处理。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct MessagePayload {
    /// 消息 ID
    #[serde(default)]
    pub id: Option<String>,
    /// 会话 ID
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// 角色
    #[serde(default)]
    pub role: Role,
    /// 消息类型
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// 文本内容
    #[serde(default)]
    pub content: String,
}

impl MessagePayload {
    /// 是否为智能体的回答正文
    pub fn is_answer(&self) -> bool {
        self.role == Role::Assistant && self.kind == MessageType::Answer
    }

    /// 是否为智能体推荐的追问
    pub fn is_follow_up(&self) -> bool {
        self.role == Role::Assistant && self.kind == MessageType::FollowUp
    }
}

/// 事件名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    MessageDelta,
    MessageCompleted,
    Done,
    Other(String),
}

impl From<&str> for EventKind {
    fn from(label: &str) -> Self {
        match label {
            EVENT_MESSAGE_DELTA => EventKind::MessageDelta,
            EVENT_MESSAGE_COMPLETED => EventKind::MessageCompleted,
            EVENT_DONE => EventKind::Done,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// 解析后的流式事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// 回答的增量片段
    Delta(MessagePayload),
    /// 一条完整的消息（回答或追问）
    Completed(MessagePayload),
    /// 流结束
    Done,
    /// 未识别的事件，原样保留名称
    Other { event: String },
}

impl StreamEvent {
    /// 从原始事件帧解析出事件
    ///
    /// 数据部分必须是合法 JSON，否则返回 `CozeError::Json`。
    /// `done` 事件接受任意 JSON（Coze 发送的是字符串 `"[DONE]"`）。
    pub fn from_frame(frame: &RawFrame) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(&frame.data).map_err(|e| {
            CozeError::Json(format!("Failed to parse event data: '{}', error: {}", frame.data, e))
        })?;

        let event = match EventKind::from(frame.event.as_str()) {
            EventKind::MessageDelta => StreamEvent::Delta(serde_json::from_value(value)?),
            EventKind::MessageCompleted => StreamEvent::Completed(serde_json::from_value(value)?),
            EventKind::Done => StreamEvent::Done,
            EventKind::Other(event) => StreamEvent::Other { event },
        };
        Ok(event)
    }

    /// 是否为结束事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// 非流式错误响应，如 `{"code":4100,"msg":"..."}`
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

// ================================================================================================
// 应用内部数据模型
// ================================================================================================

/// 一次对话调用的最终结果
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChatOutcome {
    /// 完整的回答文本
    pub content: String,
    /// 推荐的追问，按到达顺序排列
    pub follow_up_questions: Vec<String>,
}

/// 请求统计信息
#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    /// 请求耗时（毫秒）
    pub duration_ms: u64,
    /// 处理的事件数量
    pub events: usize,
    /// 使用的智能体 ID
    pub bot_id: String,
    /// 请求时间戳
    pub timestamp: Option<std::time::SystemTime>,
}

/// 带统计信息的对话结果
#[derive(Debug)]
pub struct ResponseWithStats {
    pub outcome: ChatOutcome,
    pub stats: RequestStats,
}
