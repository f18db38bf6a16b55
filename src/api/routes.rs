//! HTTP 路由
//!
//! - `GET  /api/message`               存活检查
//! - `GET  /api/generate?prompt=...`   文本编码改写
//! - `POST /api/generate`              结构化编码改写

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentContent, RewriteRequest};
use crate::workflow::RewriteFlow;

/// 路由共享状态
#[derive(Clone)]
pub struct ApiState {
    pub flow: Arc<RewriteFlow>,
    /// 服务根取消令牌，停机时取消
    pub shutdown: CancellationToken,
}

/// 构建完整路由
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/message", get(message))
        .route("/api/generate", get(generate_text).post(generate_structured))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    content: DocumentContent,
}

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    prompt: Option<String>,
    style: Option<String>,
    template: Option<String>,
}

/// POST 请求体的对象形式
#[derive(Debug, Deserialize)]
struct GenerateBody {
    segments: Option<Document>,
    title: Option<String>,
    style: Option<String>,
    template: Option<String>,
}

async fn message() -> Json<Value> {
    Json(json!({ "message": "Hello from the backend!" }))
}

async fn generate_text(
    State(state): State<ApiState>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerateResponse>, AppError> {
    let prompt = query
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::missing("prompt"))?;

    let mut request = RewriteRequest::text(prompt);
    request.style = query.style;
    request.template = query.template;

    generate(&state, request).await
}

async fn generate_structured(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = parse_generate_body(&body)?;
    generate(&state, request).await
}

async fn generate(state: &ApiState, request: RewriteRequest) -> Result<Json<GenerateResponse>, AppError> {
    let cancel = state.shutdown.child_token();
    let outcome = state.flow.run(&request, &cancel).await?;

    info!(
        "✅ 改写完成 ({} 编码, {} 次尝试)",
        outcome.content.encoding(),
        outcome.attempts
    );
    Ok(Json(GenerateResponse {
        content: outcome.content,
    }))
}

/// 解析 POST 请求体：片段数组，或 `{segments, title?, style?, template?}`
fn parse_generate_body(body: &[u8]) -> AppResult<RewriteRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::missing("segments"));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::invalid_input(format!("body is not valid JSON: {}", e)))?;

    match value {
        Value::Null => Err(AppError::missing("segments")),
        Value::Array(_) => {
            let document: Document = serde_json::from_value(value).map_err(invalid_document)?;
            Ok(RewriteRequest::structured(document))
        }
        Value::Object(_) => {
            let body: GenerateBody = serde_json::from_value(value).map_err(invalid_document)?;
            let mut document = body.segments.ok_or_else(|| AppError::missing("segments"))?;
            if body.title.is_some() {
                document.title = body.title;
            }

            let mut request = RewriteRequest::structured(document);
            request.style = body.style;
            request.template = body.template;
            Ok(request)
        }
        _ => Err(AppError::invalid_input(
            "body must be a segment array or an object with segments",
        )),
    }
}

fn invalid_document(e: serde_json::Error) -> AppError {
    AppError::invalid_input(e.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_client_error() {
            warn!("请求被拒绝: {}", self);
        } else {
            error!("请求失败: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
