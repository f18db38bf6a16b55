use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppResult, ConfigError};
use crate::models::tolerance::{
    DEFAULT_GROWTH_FACTOR, DEFAULT_MAX_RETRIES, DEFAULT_PERCENT_ALLOWANCE, DEFAULT_STATIC_ALLOWANCE,
};
use crate::models::{RetryPolicy, ToleranceState};

/// 程序配置
///
/// 进程启动时加载一次，之后只读。加载顺序：默认值 → `CONFIG_FILE` 指向的 TOML 文件 → 环境变量。
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    /// 单次补全调用的超时时间
    pub llm_timeout_secs: u64,
    // --- 重试与容差 ---
    pub max_retries: usize,
    pub tolerance_static: usize,
    pub tolerance_percent: f64,
    pub tolerance_growth: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 2048,
            llm_timeout_secs: 60,
            max_retries: DEFAULT_MAX_RETRIES,
            tolerance_static: DEFAULT_STATIC_ALLOWANCE,
            tolerance_percent: DEFAULT_PERCENT_ALLOWANCE,
            tolerance_growth: DEFAULT_GROWTH_FACTOR,
        }
    }
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<String>,
    verbose_logging: Option<bool>,
    llm: Option<FileLlmConfig>,
    retry: Option<FileRetryConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLlmConfig {
    api_key: Option<String>,
    api_base_url: Option<String>,
    model_name: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileRetryConfig {
    max_retries: Option<usize>,
    growth_factor: Option<f64>,
    tolerance: Option<ToleranceState>,
}

impl Config {
    /// 只从环境变量加载
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// 加载完整配置（含可选的 TOML 文件）
    pub fn load() -> AppResult<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Ok(Self::default().apply_file(&path)?.apply_env()),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// 从 TOML 字符串叠加配置
    pub fn apply_toml(mut self, path: &str, content: &str) -> AppResult<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            })?;

        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.verbose_logging {
            self.verbose_logging = v;
        }
        if let Some(llm) = file.llm {
            if let Some(v) = llm.api_key {
                self.llm_api_key = v;
            }
            if let Some(v) = llm.api_base_url {
                self.llm_api_base_url = v;
            }
            if let Some(v) = llm.model_name {
                self.llm_model_name = v;
            }
            if let Some(v) = llm.temperature {
                self.llm_temperature = v;
            }
            if let Some(v) = llm.max_tokens {
                self.llm_max_tokens = v;
            }
            if let Some(v) = llm.timeout_secs {
                self.llm_timeout_secs = v;
            }
        }
        if let Some(retry) = file.retry {
            if let Some(v) = retry.max_retries {
                self.max_retries = v;
            }
            if let Some(v) = retry.growth_factor {
                self.tolerance_growth = v;
            }
            if let Some(tolerance) = retry.tolerance {
                self.tolerance_static = tolerance.static_allowance;
                self.tolerance_percent = tolerance.percent_allowance;
            }
        }
        Ok(self)
    }

    fn apply_file(self, path: &str) -> AppResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.to_string(),
                source,
            })?;
        self.apply_toml(path, &content)
    }

    fn apply_env(self) -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(self.bind_addr),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging),
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE", self.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", self.llm_max_tokens),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", self.llm_timeout_secs),
            max_retries: env_parse("MAX_RETRIES", self.max_retries),
            tolerance_static: env_parse("TOLERANCE_STATIC", self.tolerance_static),
            tolerance_percent: env_parse("TOLERANCE_PERCENT", self.tolerance_percent),
            tolerance_growth: env_parse("TOLERANCE_GROWTH", self.tolerance_growth),
        }
    }

    /// 启动前检查
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            }
            .into());
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must be at least 1"));
        }
        if !(self.tolerance_growth >= 1.0) {
            return Err(invalid("tolerance_growth", "must be >= 1.0"));
        }
        if !(self.tolerance_percent >= 0.0) {
            return Err(invalid("tolerance_percent", "must be >= 0.0"));
        }
        if self.llm_timeout_secs == 0 {
            return Err(invalid("llm_timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// 由配置生成的默认重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            growth_factor: self.tolerance_growth,
            initial_tolerance: ToleranceState::new(self.tolerance_static, self.tolerance_percent),
        }
    }
}

fn env_parse<T: FromStr>(var_name: &str, fallback: T) -> T {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", var_name, value);
            fallback
        }),
        Err(_) => fallback,
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::AppError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn valid_config() -> Config {
        Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_apply_toml_overlay() {
        let content = r#"
bind_addr = "127.0.0.1:8080"

[llm]
model_name = "gpt-4o"
temperature = 0.2
timeout_secs = 15

[retry]
max_retries = 5
growth_factor = 1.5
tolerance = { static_allowance = 50, percent_allowance = 0.3 }
"#;
        let config = Config::default().apply_toml("test.toml", content).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.llm_model_name, "gpt-4o");
        assert_eq!(config.llm_temperature, 0.2);
        assert_eq!(config.llm_timeout_secs, 15);
        // 未出现的字段保持默认
        assert_eq!(config.llm_max_tokens, 2048);

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.growth_factor, 1.5);
        assert_eq!(policy.initial_tolerance, ToleranceState::new(50, 0.3));
    }

    #[test]
    fn test_apply_toml_rejects_unknown_keys() {
        let err = Config::default()
            .apply_toml("bad.toml", "bind = \"x\"")
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn test_from_env_overrides_and_ignores_bad_values() {
        std::env::set_var("TOLERANCE_GROWTH", "3.0");
        std::env::set_var("LLM_MAX_TOKENS", "lots");
        let config = Config::from_env();
        std::env::remove_var("TOLERANCE_GROWTH");
        std::env::remove_var("LLM_MAX_TOKENS");

        assert_eq!(config.tolerance_growth, 3.0);
        // 无法解析的值回退到默认
        assert_eq!(config.llm_max_tokens, 2048);
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Environment variable OPENAI_API_KEY is not set");

        let config = Config {
            max_retries: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            tolerance_growth: 0.5,
            ..valid_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            tolerance_percent: f64::NAN,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }
}
