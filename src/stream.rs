//! 流式响应处理模块
use crate::{
    error::{CozeError, Result},
    types::StreamEvent,
};
use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use log::{debug, warn};
use std::{
    pin::Pin,
    task::{Context, Poll},
};

// ================================================================================================
// 事件帧切分
// ================================================================================================

/// 事件帧分隔符
pub const FRAME_DELIMITER: &[u8] = b"\n\n";
/// 事件名称行前缀
pub const EVENT_FIELD: &str = "event:";
/// 数据行前缀
pub const DATA_FIELD: &str = "data:";

/// 跨数据块保留半帧的缓冲区
///
/// 按字节切分再解码，跨块的多字节字符不会被截断。
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个数据块，返回其中所有完整的事件帧
    ///
    /// 最后一个分隔符之后的内容（可能为空）留在缓冲区，等待下一个数据块。
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self
            .buffer
            .windows(FRAME_DELIMITER.len())
            .position(|w| w == FRAME_DELIMITER)
        {
            let frame = self.buffer.split_to(pos + FRAME_DELIMITER.len());
            frames.push(String::from_utf8_lossy(&frame[..pos]).into_owned());
        }
        frames
    }

    /// 尚未构成完整帧的剩余数据
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// 事件帧的原始内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// 事件名称
    pub event: String,
    /// 数据（JSON 文本）
    pub data: String,
}

/// 解析单个事件帧
///
/// 第一行是 `event:`，第二行是 `data:`。空帧或不足两行的帧返回 `None`。
pub fn parse_frame(frame: &str) -> Option<RawFrame> {
    if frame.trim().is_empty() {
        return None;
    }

    let mut lines = frame.split('\n');
    let (Some(event_line), Some(data_line)) = (lines.next(), lines.next()) else {
        return None;
    };

    Some(RawFrame {
        event: strip_field(event_line, EVENT_FIELD).to_string(),
        data: strip_field(data_line, DATA_FIELD).to_string(),
    })
}

fn strip_field<'a>(line: &'a str, field: &str) -> &'a str {
    let line = line.trim();
    line.strip_prefix(field).unwrap_or(line).trim()
}

// ================================================================================================
// 事件流
// ================================================================================================

/// 把字节流转换为事件流
///
/// - 传输层错误作为 `Err` 产出，随后流结束
/// - 无法解析的帧记录日志后跳过，不影响后续帧
/// - 产出 `Done` 之后立即结束
pub fn event_stream<S, E>(mut bytes_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<CozeError> + Send + 'static,
{
    try_stream! {
        let mut frames = FrameBuffer::new();
        let mut finished = false;

        while !finished {
            let Some(bytes_res) = bytes_stream.next().await else {
                break;
            };
            let bytes = bytes_res.map_err(Into::<CozeError>::into)?;

            for frame in frames.push(&bytes) {
                let Some(raw) = parse_frame(&frame) else {
                    debug!("Dropping malformed frame: {:?}", frame);
                    continue;
                };

                match StreamEvent::from_frame(&raw) {
                    Ok(event) => {
                        finished = event.is_terminal();
                        yield event;
                        if finished {
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping unparseable '{}' frame: {}", raw.event, e),
                }
            }
        }

        if !finished && !frames.is_empty() {
            debug!("Leftover buffer: {:?}", String::from_utf8_lossy(frames.remainder()));
        }
    }
}

/// `Stream<Item = Result<StreamEvent>>` 的简单包装
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>,
}

impl EventStream {
    pub fn new(stream: impl Stream<Item = Result<StreamEvent>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// 增量文本流，每一项都是新增的回答片段
pub struct TextStream {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl TextStream {
    pub fn new(stream: impl Stream<Item = Result<String>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for TextStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessagePayload;
    use futures::{TryStreamExt, stream};

    fn bytes_of(chunks: &[&str]) -> impl Stream<Item = Result<Bytes>> + Send + Unpin + 'static {
        let owned: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        stream::iter(owned)
    }

    #[test]
    fn test_push_keeps_partial_frame() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"event:done\nda").is_empty());
        assert_eq!(buffer.remainder(), b"event:done\nda");

        let frames = buffer.push(b"ta:\"[DONE]\"\n\nevent:");
        assert_eq!(frames, vec!["event:done\ndata:\"[DONE]\"".to_string()]);
        assert_eq!(buffer.remainder(), b"event:");
    }

    #[test]
    fn test_push_delimiter_split_across_chunks() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"a\n").is_empty());
        assert_eq!(buffer.push(b"\nb\n\n"), vec!["a".to_string(), "b".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_push_consecutive_delimiters_yield_empty_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"a\n\n\n\nb");
        assert_eq!(frames, vec!["a".to_string(), String::new()]);
        assert_eq!(buffer.remainder(), b"b");
    }

    #[test]
    fn test_push_multibyte_char_split_across_chunks() {
        let text = "event:x\ndata:\"你好\"\n\n".as_bytes();
        let split = text.len() - 4;
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(&text[..split]).is_empty());
        let frames = buffer.push(&text[split..]);
        assert_eq!(frames, vec!["event:x\ndata:\"你好\"".to_string()]);
    }

    #[test]
    fn test_parse_frame_strips_markers() {
        let raw = parse_frame("event: done \ndata: \"[DONE]\"").unwrap();
        assert_eq!(raw.event, "done");
        assert_eq!(raw.data, "\"[DONE]\"");
    }

    #[test]
    fn test_parse_frame_rejects_empty_and_single_line() {
        assert!(parse_frame("").is_none());
        assert!(parse_frame(" \n ").is_none());
        assert!(parse_frame("event:done").is_none());
    }

    #[tokio::test]
    async fn test_event_stream_skips_bad_json_and_stops_at_done() {
        let stream = event_stream(bytes_of(&[
            "event:conversation.message.delta\ndata:{broken\n\n",
            "event:conversation.message.delta\ndata:{\"role\":\"assistant\",\"type\":\"answer\",\"content\":\"hi\"}\n\n",
            "event:done\ndata:\"[DONE]\"\n\n",
            "event:conversation.message.delta\ndata:{\"content\":\"late\"}\n\n",
        ]));
        let events: Vec<StreamEvent> = stream.try_collect().await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::Delta(MessagePayload {
                role: crate::types::Role::Assistant,
                kind: crate::types::MessageType::Answer,
                content: "hi".into(),
                ..Default::default()
            })
        );
        assert_eq!(events[1], StreamEvent::Done);
    }

    #[tokio::test]
    async fn test_event_stream_surfaces_transport_error() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"event:conversation.chat.created\ndata:{}\n\n")),
            Err(CozeError::StreamError("connection reset".into())),
            Ok(Bytes::from_static(b"event:done\ndata:{}\n\n")),
        ];
        let mut stream = Box::pin(event_stream(stream::iter(chunks)));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            StreamEvent::Other {
                event: "conversation.chat.created".into()
            }
        );
        assert!(matches!(stream.next().await, Some(Err(CozeError::StreamError(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_stream_wrapper_is_transparent() {
        let mut events = EventStream::new(event_stream(bytes_of(&["event:done\ndata:\"[DONE]\"\n\n"])));
        assert_eq!(events.next().await.unwrap().unwrap(), StreamEvent::Done);
        assert!(events.next().await.is_none());
    }
}
