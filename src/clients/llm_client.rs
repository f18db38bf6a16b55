//! 补全服务客户端
//!
//! 只负责"发出一次补全请求并拿回原始文本"，不检查文本内容是否合规，也不重试。

use std::time::Duration;

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::services::prompt_service::Prompt;
use crate::utils::truncate_text;

/// 模型调用参数
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }
}

/// 补全服务
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 发送提示词，返回模型的原始文本
    async fn complete(
        &self,
        prompt: &Prompt,
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> AppResult<String>;
}

/// OpenAI 兼容接口的补全客户端
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    timeout: Duration,
}

impl LlmClient {
    /// 创建新的补全客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::RequestBuild {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key: config.llm_api_key.clone(),
            api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
        })
    }

    /// 覆盖单次调用超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, request: &CreateChatCompletionRequest, model: &str) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("补全服务请求失败: {}", e);
                AppError::transport(e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::transport(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            warn!(
                "补全服务返回错误状态 {}: {}",
                status,
                truncate_text(&body, 200)
            );
            return Err(AppError::transport(Some(status.as_u16()), body));
        }

        extract_content(model, &body)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(
        &self,
        prompt: &Prompt,
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        debug!("调用补全服务，模型: {}", params.model);
        debug!("用户消息长度: {} 字符", prompt.user.chars().count());

        let request = build_request(prompt, params)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("补全请求已取消");
                Err(LlmError::Cancelled.into())
            }
            result = tokio::time::timeout(self.timeout, self.send(&request, &params.model)) => {
                match result {
                    Ok(content) => content,
                    Err(_) => {
                        warn!("补全请求超时 ({:?})", self.timeout);
                        Err(LlmError::Timeout {
                            millis: self.timeout.as_millis() as u64,
                        }
                        .into())
                    }
                }
            }
        }
    }
}

/// 构建补全请求体
pub fn build_request(prompt: &Prompt, params: &ModelParams) -> AppResult<CreateChatCompletionRequest> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content(prompt.system.as_str())
        .build()
        .map_err(request_build_error)?;
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt.user.as_str())
        .build()
        .map_err(request_build_error)?;

    CreateChatCompletionRequestArgs::default()
        .model(&params.model)
        .messages(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
        .temperature(params.temperature)
        .max_tokens(params.max_tokens)
        .build()
        .map_err(request_build_error)
}

fn request_build_error(e: impl std::fmt::Display) -> AppError {
    LlmError::RequestBuild {
        reason: e.to_string(),
    }
    .into()
}

/// 只读取第一条消息内容，兼容省略 id、created 等字段的服务
#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// 从补全响应体中取出第一条回复
pub fn extract_content(model: &str, body: &str) -> AppResult<String> {
    let parsed: CompletionBody = serde_json::from_str(body).map_err(|e| {
        AppError::transport(
            Some(200),
            format!("invalid completion body ({}): {}", e, truncate_text(body, 200)),
        )
    })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| LlmError::EmptyResponse {
            model: model.to_string(),
        })?;

    debug!("补全服务调用成功，返回 {} 字符", content.chars().count());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn test_params() -> ModelParams {
        ModelParams {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.5,
            max_tokens: 256,
        }
    }

    fn test_prompt() -> Prompt {
        Prompt {
            system: "system text".to_string(),
            user: "user text".to_string(),
        }
    }

    fn client_for(base_url: &str) -> LlmClient {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_api_base_url: base_url.to_string(),
            ..Config::default()
        };
        LlmClient::new(&config).unwrap()
    }

    /// 在本地端口上启动一个假的补全服务
    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/", addr)
    }

    #[test]
    fn test_build_request_body() {
        let request = build_request(&test_prompt(), &test_params()).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 256);
        assert!((body["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user text");
    }

    #[test]
    fn test_extract_content() {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "  [{\"pinned\":\"a\"}]\n"},
                "finish_reason": "stop"
            }]
        })
        .to_string();
        assert_eq!(extract_content("gpt-4o-mini", &body).unwrap(), "[{\"pinned\":\"a\"}]");
    }

    #[test]
    fn test_extract_content_empty() {
        for body in [
            json!({"choices": []}),
            json!({"choices": [{"message": {"role": "assistant", "content": null}}]}),
            json!({"choices": [{"message": {"role": "assistant", "content": "   "}}]}),
        ] {
            let err = extract_content("m", &body.to_string()).unwrap_err();
            assert!(matches!(err, AppError::Llm(LlmError::EmptyResponse { .. })));
        }

        let err = extract_content("m", "<html>gateway</html>").unwrap_err();
        assert!(matches!(
            err,
            AppError::Llm(LlmError::Transport { status: Some(200), .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_against_local_provider() {
        async fn handler(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer sk-test");
            if !authorized {
                return (StatusCode::UNAUTHORIZED, Json(json!({"error": "no key"})));
            }
            let content = format!("echo: {}", body["messages"][1]["content"].as_str().unwrap_or(""));
            (
                StatusCode::OK,
                Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})),
            )
        }

        let base = spawn_provider(Router::new().route("/v1/chat/completions", post(handler))).await;
        let client = client_for(&base);
        let content = client
            .complete(&test_prompt(), &test_params(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(content, "echo: user text");
    }

    #[tokio::test]
    async fn test_provider_error_keeps_status_and_body() {
        async fn handler() -> (StatusCode, &'static str) {
            (StatusCode::TOO_MANY_REQUESTS, "{\"error\":\"rate limited\"}")
        }

        let base = spawn_provider(Router::new().route("/v1/chat/completions", post(handler))).await;
        let err = client_for(&base)
            .complete(&test_prompt(), &test_params(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AppError::Llm(LlmError::Transport { status, body }) => {
                assert_eq!(status, Some(429));
                assert!(body.contains("rate limited"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        async fn handler() -> &'static str {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }

        let base = spawn_provider(Router::new().route("/v1/chat/completions", post(handler))).await;
        let err = client_for(&base)
            .with_timeout(Duration::from_millis(100))
            .complete(&test_prompt(), &test_params(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::Timeout { millis: 100 })));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client_for("http://127.0.0.1:9/v1")
            .complete(&test_prompt(), &test_params(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::Cancelled)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        // 端口 9 (discard) 在测试环境中通常没有监听
        let err = client_for("http://127.0.0.1:9/v1")
            .complete(&test_prompt(), &test_params(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::Transport { status: None, .. })));
    }
}
