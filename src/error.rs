//! 错误类型
//!
//! 错误信息会直接作为 HTTP 响应体返回给调用方，因此 Display 文本保持英文；
//! 只有 `RewriteError::Exhausted` 之前的校验失败会在流程内部被重试消化。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求输入错误（400）
    #[error(transparent)]
    Input(#[from] InputError),
    /// 补全服务错误
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// 改写流程错误
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// HTTP 服务错误
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// 请求输入错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 没有提供文档
    #[error("Missing {what}")]
    Missing { what: &'static str },
    /// 文档格式不合法
    #[error("Invalid document: {reason}")]
    Invalid { reason: String },
}

/// 补全服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 网络或服务端失败，保留状态码和响应体用于排查
    #[error("Completion request failed (status: {}): {body}", display_status(.status))]
    Transport { status: Option<u16>, body: String },
    /// 构建请求失败
    #[error("Failed to build completion request: {reason}")]
    RequestBuild { reason: String },
    /// 返回内容为空
    #[error("Completion provider returned no content (model: {model})")]
    EmptyResponse { model: String },
    /// 单次调用超时
    #[error("Completion request timed out after {millis}ms")]
    Timeout { millis: u64 },
    /// 请求被取消
    #[error("Completion request was cancelled")]
    Cancelled,
}

/// 改写流程错误
#[derive(Debug, Error)]
pub enum RewriteError {
    /// 结构化响应无法解析回片段数组
    #[error("Malformed completion response: {reason}")]
    MalformedResponse { reason: String, preview: String },
    /// 重试次数用尽
    #[error("Failed to generate valid content after multiple attempts.")]
    Exhausted { attempts: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量不存在
    #[error("Environment variable {var_name} is not set")]
    EnvVarNotFound { var_name: String },
    /// 配置值不合法
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 读取配置文件失败
    #[error("Failed to read config file {path}: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("Failed to parse config file {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// HTTP 服务错误
#[derive(Debug, Error)]
pub enum ServerError {
    /// 监听地址绑定失败
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// 服务运行中出错
    #[error("Server terminated: {source}")]
    ServeFailed {
        #[source]
        source: std::io::Error,
    },
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 缺少输入
    pub fn missing(what: &'static str) -> Self {
        AppError::Input(InputError::Missing { what })
    }

    /// 输入不合法
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AppError::Input(InputError::Invalid {
            reason: reason.into(),
        })
    }

    /// 补全服务传输失败
    pub fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        AppError::Llm(LlmError::Transport {
            status,
            body: body.into(),
        })
    }

    /// 结构化响应解析失败
    pub fn malformed(reason: impl Into<String>, preview: impl Into<String>) -> Self {
        AppError::Rewrite(RewriteError::MalformedResponse {
            reason: reason.into(),
            preview: preview.into(),
        })
    }

    /// 是否属于调用方的输入问题
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Input(_))
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::missing("prompt").status_code(), 400);
        assert_eq!(AppError::invalid_input("bad").status_code(), 400);
        assert_eq!(AppError::transport(Some(502), "bad gateway").status_code(), 500);
        assert_eq!(AppError::malformed("eof", "[").status_code(), 500);
        assert_eq!(
            AppError::from(RewriteError::Exhausted { attempts: 3 }).status_code(),
            500
        );
    }

    #[test]
    fn test_messages_are_caller_facing() {
        assert_eq!(AppError::missing("prompt").to_string(), "Missing prompt");
        assert_eq!(
            AppError::from(RewriteError::Exhausted { attempts: 3 }).to_string(),
            "Failed to generate valid content after multiple attempts."
        );

        let err = AppError::transport(Some(429), "rate limited");
        assert_eq!(
            err.to_string(),
            "Completion request failed (status: 429): rate limited"
        );
        let err = AppError::transport(None, "connection refused");
        assert!(err.to_string().contains("status: none"));
    }
}
