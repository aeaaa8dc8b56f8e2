//! 工具函数模块
use crate::{
    config::Config,
    types::{ChatRequest, ContentType, Message, Role},
};

/// 创建用户文本消息的便捷函数
///
/// # 参数
///
/// * `content` - 消息内容
///
/// # 返回
///
/// 新创建的消息实例
pub fn user_message(content: &str) -> Message {
    Message {
        role: Role::User,
        content: content.to_string(),
        content_type: ContentType::Text,
    }
}

/// 构建 `/v3/chat` 的流式请求体
///
/// 请求体只追加一条用户消息，`stream` 始终为 `true`。
pub(crate) fn chat_request(config: &Config, content: &str) -> ChatRequest {
    ChatRequest {
        bot_id: config.bot_id.clone(),
        user_id: config.user_id.clone(),
        stream: true,
        additional_messages: vec![user_message(content)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_creation() {
        let msg = user_message("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert_eq!(msg.content_type, ContentType::Text);
    }

    #[test]
    fn test_chat_request_uses_config_ids() {
        let config = Config::default()
            .with_bot_id("bot_123".to_string())
            .with_user_id("user_42".to_string());
        let request = chat_request(&config, "你好");
        assert_eq!(request.bot_id, "bot_123");
        assert_eq!(request.user_id, "user_42");
        assert!(request.stream);
        assert_eq!(request.additional_messages, vec![user_message("你好")]);
    }
}
