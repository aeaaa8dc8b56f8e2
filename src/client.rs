//! Coze 客户端核心模块
use crate::{
    accumulator::{ChatAccumulator, accumulate, drive},
    config::Config,
    error::{CozeError, Result},
    stream::{EventStream, TextStream, event_stream},
    types::{ApiErrorBody, ChatOutcome, RequestStats, ResponseWithStats},
    utils::chat_request,
};
use async_stream::try_stream;
use futures::StreamExt;
use log::{debug, error};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::Semaphore;

// ================================================================================================
// 核心客户端模块
// ================================================================================================

/// Coze 智能体客户端
///
/// 每次调用独立持有自己的缓冲区和累加状态，多个调用可以并发进行。
#[derive(Debug, Clone)]
pub struct CozeClient {
    client: Arc<Client>,
    config: Arc<Config>,
    semaphore: Arc<Semaphore>,
}

impl CozeClient {
    /// 创建一个新的 `CozeClient` 实例
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(config.tcp_nodelay)
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build reqwest client: {}", e);
                Client::new()
            });

        let semaphore = Semaphore::new(config.max_concurrent_requests.unwrap_or(16));

        Self {
            client: Arc::new(client),
            config: Arc::new(config),
            semaphore: Arc::new(semaphore),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 构建 API 请求所需的 HTTP 标头
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|e| CozeError::InvalidRequest(format!("Invalid API key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        Ok(headers)
    }

    /// 发送 HTTP 请求并检查响应状态
    ///
    /// 并发许可只覆盖建立连接的阶段，事件流的读取不占用许可。
    async fn send(&self, request_builder: RequestBuilder) -> Result<Response> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| CozeError::Api(format!("Semaphore acquisition failed: {}", e)))?;

        let response_result = request_builder.send().await;
        drop(permit);

        check_response(response_result?).await
    }

    /// 发起流式对话请求，返回原始事件流
    pub async fn stream_chat(&self, message: &str) -> Result<EventStream> {
        let request = chat_request(&self.config, message);
        let headers = self.build_headers()?;
        let request_builder = self
            .client
            .post(self.config.chat_endpoint())
            .headers(headers)
            .json(&request);

        debug!("Starting chat with bot {}", self.config.bot_id);
        let response = self.send(request_builder).await?;
        Ok(EventStream::new(event_stream(response.bytes_stream())))
    }

    /// 发起对话，增量文本通过 `on_update` 实时回调
    ///
    /// 收到 `done` 后返回完整回答和追问列表。
    pub async fn chat<F>(&self, message: &str, on_update: F) -> Result<ChatOutcome>
    where
        F: FnMut(&str),
    {
        let events = self.stream_chat(message).await?;
        accumulate(events, on_update).await
    }

    /// 发起对话，并返回统计信息
    pub async fn chat_with_stats<F>(&self, message: &str, on_update: F) -> Result<ResponseWithStats>
    where
        F: FnMut(&str),
    {
        let start_time = Instant::now();
        let events = self.stream_chat(message).await?;
        let accumulator = drive(events, on_update).await?;

        let stats = RequestStats {
            duration_ms: start_time.elapsed().as_millis() as u64,
            events: accumulator.events(),
            bot_id: self.config.bot_id.clone(),
            timestamp: Some(SystemTime::now()),
        };
        Ok(ResponseWithStats {
            outcome: accumulator.into_outcome(),
            stats,
        })
    }

    /// 发起对话，返回增量文本流
    ///
    /// 流中的片段拼接起来就是完整回答；收到 `done` 后流结束。
    pub async fn stream_text(&self, message: &str) -> Result<TextStream> {
        let mut events = self.stream_chat(message).await?;

        Ok(TextStream::new(try_stream! {
            let mut accumulator = ChatAccumulator::new();
            let mut finished = false;

            while !finished {
                let event = match events.next().await {
                    Some(event) => event?,
                    None => Err(CozeError::Incomplete)?,
                };

                let mut fragments = Vec::new();
                finished = accumulator
                    .apply(event, &mut |text: &str| fragments.push(text.to_string()))
                    .is_done();
                for fragment in fragments {
                    yield fragment;
                }
            }
        }))
    }
}

/// 把异常的 HTTP 状态和非流式的错误响应转换为错误
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = format!("Request failed with status {}: {}", status, body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CozeError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => CozeError::RateLimit(message),
            _ => CozeError::Api(message),
        });
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        let body: ApiErrorBody = response.json().await?;
        return Err(CozeError::Api(format!("code {}: {}", body.code, body.msg)));
    }

    Ok(response)
}
