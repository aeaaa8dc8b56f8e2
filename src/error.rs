//! 错误处理模块

use thiserror::Error;

/// CozeAI 库的统一错误类型
///
/// 传输层错误会中止整个调用；单个事件帧的解析错误只在流内部记录并跳过，
/// 不会以这个类型暴露给调用方。
#[derive(Debug, Error)]
pub enum CozeError {
    /// HTTP 请求相关错误
    #[error("HTTP请求失败: {0}")]
    Http(#[source] reqwest::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON处理错误: {0}")]
    Json(String),

    /// API 服务端错误
    #[error("API错误: {0}")]
    Api(String),

    /// 请求超时错误
    #[error("请求超时")]
    Timeout,

    /// 流处理相关错误
    #[error("流处理错误: {0}")]
    StreamError(String),

    /// 事件流在 `done` 之前结束
    #[error("事件流在结束标记之前中断")]
    Incomplete,

    /// API 请求频率限制
    #[error("请求频率超限: {0}")]
    RateLimit(String),

    /// 身份验证失败
    #[error("身份验证失败: {0}")]
    Auth(String),

    /// 请求参数无效
    #[error("请求参数无效: {0}")]
    InvalidRequest(String),

    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(String),

    /// UTF8转换错误
    #[error("UTF8转换错误: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CozeAI 库的 Result 类型别名
pub type Result<T> = std::result::Result<T, CozeError>;

impl From<reqwest::Error> for CozeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CozeError::Timeout
        } else {
            CozeError::Http(e)
        }
    }
}

impl From<serde_json::Error> for CozeError {
    fn from(e: serde_json::Error) -> Self {
        CozeError::Json(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for CozeError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        CozeError::Utf8(e.utf8_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_error_maps_to_json() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CozeError::from(err);
        assert!(matches!(err, CozeError::Json(_)));
    }

    #[test]
    fn test_from_utf8_error_maps_to_utf8() {
        let err = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(CozeError::from(err), CozeError::Utf8(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(CozeError::Incomplete.to_string(), "事件流在结束标记之前中断");
        assert_eq!(CozeError::Auth("bad key".into()).to_string(), "身份验证失败: bad key");
    }
}
