//! 配置模块
use crate::error::{CozeError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

// ===============================================================================================
// 配置模块
// ===============================================================================================

/// 默认 API 地址
pub const DEFAULT_API_BASE: &str = "https://api.coze.cn";
/// 默认用户标识
pub const DEFAULT_USER_ID: &str = "user_id";

/// Coze 客户端配置
///
/// 包含所有必要的配置参数，支持 Builder 模式和环境变量配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 智能体 ID，在 Coze 平台获取
    pub(crate) bot_id: String,
    /// API 密钥
    pub(crate) api_key: String,
    /// 用户标识
    pub(crate) user_id: String,
    /// API 基础 URL
    pub(crate) api_base: String,
    /// 请求超时时间，包含读取整个事件流的时间
    pub(crate) timeout: Duration,
    /// 最大并发请求数
    pub(crate) max_concurrent_requests: Option<usize>,
    /// 连接池空闲超时时间
    pub(crate) pool_idle_timeout: Duration,
    /// 每个主机的最大空闲连接数
    pub(crate) pool_max_idle_per_host: usize,
    /// TCP Keepalive
    pub(crate) tcp_keepalive: Duration,
    /// TCP Nodelay
    pub(crate) tcp_nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_id: String::new(),
            api_key: String::new(),
            user_id: DEFAULT_USER_ID.into(),
            api_base: DEFAULT_API_BASE.into(),
            timeout: Duration::from_secs(120),
            max_concurrent_requests: Some(16),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 8,
            tcp_keepalive: Duration::from_secs(60),
            tcp_nodelay: true,
        }
    }
}

/// 生成 Config Builder 方法的宏
///
/// 自动生成 `with_field_name` 形式的 builder 方法
macro_rules! config_builder {
    ($field:ident, $type:ty) => {
        paste::paste! {
            #[doc = "设置 `"]
            #[doc = stringify!($field)]
            #[doc = "`"]
            pub fn [<with_ $field>](mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        }
    };
    ($field:ident, $type:ty, option) => {
        paste::paste! {
            #[doc = "设置 `"]
            #[doc = stringify!($field)]
            #[doc = "`"]
            pub fn [<with_ $field>](mut self, $field: $type) -> Self {
                self.$field = Some($field);
                self
            }
        }
    };
}

impl Config {
    pub fn bot_id(&self) -> &str { &self.bot_id }
    pub fn api_key(&self) -> &str { &self.api_key }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn api_base(&self) -> &str { &self.api_base }
    pub fn timeout(&self) -> Duration { self.timeout }

    /// 对话接口地址
    pub fn chat_endpoint(&self) -> String {
        format!("{}/v3/chat", self.api_base.trim_end_matches('/'))
    }

    /// 从环境变量和 `.env` 文件加载配置
    ///
    /// 环境变量会覆盖 `.env` 文件中的设置
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let api_key = env::var("COZE_API_KEY")
            .map_err(|_| CozeError::Config("COZE_API_KEY not found".into()))?;
        let bot_id = env::var("COZE_BOT_ID")
            .map_err(|_| CozeError::Config("COZE_BOT_ID not found".into()))?;

        let api_base = env::var("COZE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let user_id = env::var("COZE_USER_ID").unwrap_or_else(|_| DEFAULT_USER_ID.to_string());

        let config = Config {
            api_key,
            bot_id,
            api_base,
            user_id,
            ..Default::default()
        };

        Ok(config)
    }

    // 使用宏生成 builder 方法
    config_builder!(api_base, String);
    config_builder!(bot_id, String);
    config_builder!(api_key, String);
    config_builder!(user_id, String);
    config_builder!(timeout, Duration);
    config_builder!(max_concurrent_requests, usize, option);
    config_builder!(pool_idle_timeout, Duration);
    config_builder!(pool_max_idle_per_host, usize);
    config_builder!(tcp_keepalive, Duration);
    config_builder!(tcp_nodelay, bool);

    /// 自动生成随机用户标识
    pub fn with_user_id_auto(mut self) -> Self {
        let suffix: String = std::iter::repeat_with(fastrand::alphanumeric).take(16).collect();
        self.user_id = format!("user_{}", suffix);
        self
    }
}
