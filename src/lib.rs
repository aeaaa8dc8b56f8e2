//! # CozeAI - Coze 智能体流式客户端
//!
//! CozeAI 调用 Coze 的 `/v3/chat` 流式接口，把服务端推送的事件流
//! 累加成完整回答，并在过程中实时回调增量文本。
//!
//! ## 主要特性
//!
//! - 🔄 **流式响应**：按 `\n\n` 切分事件帧，跨数据块的半帧会保留到下一块。
//! - 🩹 **自我修复**：`completed` 事件携带的完整回答会补齐丢失的增量片段。
//! - 💡 **追问收集**：按到达顺序收集智能体推荐的追问。
//! - 🔧 **灵活配置**：支持环境变量、`.env` 文件和 Builder 模式。
//! - 🛡️ **错误处理**：传输错误立即中止调用，单帧解析错误只记录日志并跳过。
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use cozeai::client::CozeClient;
//! use cozeai::config::Config;
//! use cozeai::error::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // 从环境变量加载配置 (需要设置 COZE_API_KEY 和 COZE_BOT_ID)
//!     let config = Config::from_env()?;
//!     let client = CozeClient::new(config);
//!
//!     let outcome = client.chat("你好！", |text| print!("{}", text)).await?;
//!     println!();
//!     println!("追问: {:?}", outcome.follow_up_questions);
//!
//!     Ok(())
//! }
//! ```

// 模块定义
pub mod accumulator;
pub mod client;
pub mod config;
pub mod error;
pub mod stream;
pub mod types;
pub mod utils;

pub use accumulator::{ChatAccumulator, Progress, accumulate};
pub use client::CozeClient;
use error::Result;
use futures::future::join_all;
use types::{ChatOutcome, ResponseWithStats};

// ================================================================================================
//  并发工具函数
// ================================================================================================

/// 批量发起对话
///
/// 并发处理多个提示，每个调用各自持有缓冲区和累加状态。
/// 不需要增量回调时使用。
///
/// # 参数
///
/// * `client` - `CozeClient` 实例的引用。
/// * `prompts` - 一个字符串切片，包含所有需要处理的提示。
///
/// # 返回
///
/// 一个向量，包含每个提示的处理结果 (`Result<ChatOutcome>`)，顺序与输入一致。
///
/// # 示例
///
/// ```rust,no_run
/// use cozeai::client::CozeClient;
/// use cozeai::config::Config;
/// use cozeai::batch_chat;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CozeClient::new(Config::from_env()?);
///
///     let prompts = vec!["今天穿什么?", "推荐一本书"];
///     for result in batch_chat(&client, &prompts).await {
///         match result {
///             Ok(outcome) => println!("成功: {}", outcome.content),
///             Err(e) => eprintln!("失败: {}", e),
///         }
///     }
///
///     Ok(())
/// }
/// ```
pub async fn batch_chat(client: &CozeClient, prompts: &[&str]) -> Vec<Result<ChatOutcome>> {
    let futures = prompts
        .iter()
        .map(|p| client.chat(p, |_: &str| {}))
        .collect::<Vec<_>>();
    join_all(futures).await
}

/// 批量发起对话（带统计信息）
pub async fn batch_chat_with_stats(
    client: &CozeClient,
    prompts: &[&str],
) -> Vec<Result<ResponseWithStats>> {
    let futures = prompts
        .iter()
        .map(|p| client.chat_with_stats(p, |_: &str| {}))
        .collect::<Vec<_>>();
    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn answer_body(content: &str) -> Vec<u8> {
        format!(
            "event:conversation.message.completed\ndata:{}\n\nevent:done\ndata:\"[DONE]\"\n\n",
            serde_json::json!({"role": "assistant", "type": "answer", "content": content})
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_batch_chat_keeps_input_order() {
        let server = MockServer::start().await;
        for (prompt, reply) in [("one", "first"), ("two", "second"), ("bad", "")] {
            let template = if prompt == "bad" {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_raw(answer_body(reply), "text/event-stream")
            };
            Mock::given(method("POST"))
                .and(path("/v3/chat"))
                .and(body_partial_json(serde_json::json!({
                    "additional_messages": [{"content": prompt}]
                })))
                .respond_with(template)
                .mount(&server)
                .await;
        }

        let client = CozeClient::new(
            Config::default()
                .with_api_base(server.uri())
                .with_api_key("k".to_string())
                .with_bot_id("b".to_string()),
        );
        let results = batch_chat(&client, &["one", "two", "bad"]).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().content, "first");
        assert_eq!(results[1].as_ref().unwrap().content, "second");
        assert!(matches!(results[2], Err(error::CozeError::Api(_))));

        let with_stats = batch_chat_with_stats(&client, &["two"]).await;
        assert_eq!(with_stats[0].as_ref().unwrap().outcome.content, "second");
        assert_eq!(with_stats[0].as_ref().unwrap().stats.events, 2);
    }
}
