//! 改写流程 - 流程层
//!
//! 核心职责：定义"一个请求"的完整处理流程，并负责重试
//!
//! 流程顺序：
//! 1. 构建提示词
//! 2. 调用补全服务 → 解析响应 → 校验固定文本
//! 3. 校验通过即返回；校验失败则放宽容差重试，直到达到最大尝试次数
//!
//! 补全调用失败、响应无法解析、请求被取消都会立即终止流程，不重试。
//! 每次尝试都完整结束（包括网络调用）后才开始下一次。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::{CompletionProvider, ModelParams};
use crate::error::{AppError, AppResult, LlmError, RewriteError};
use crate::models::{
    pinned_texts, DocumentContent, RetryPolicy, RewriteRequest, ToleranceState,
};
use crate::services::{build_prompt, parse_response, verify};
use crate::workflow::rewrite_ctx::RewriteCtx;

/// 改写成功的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    /// 通过校验的文档，编码方式与输入相同
    pub content: DocumentContent,
    /// 共进行了几次尝试
    pub attempts: usize,
    /// 最后一次尝试使用的容差
    pub tolerance: ToleranceState,
}

/// 改写流程
///
/// - 编排 提示词 → 补全 → 解析 → 校验 的完整流程
/// - 决定何时重试、何时放弃
/// - 不持有任何请求间共享的可变状态
pub struct RewriteFlow {
    provider: Arc<dyn CompletionProvider>,
    params: ModelParams,
    policy: RetryPolicy,
}

impl RewriteFlow {
    /// 创建新的改写流程
    pub fn new(provider: Arc<dyn CompletionProvider>, params: ModelParams, policy: RetryPolicy) -> Self {
        Self {
            provider,
            params,
            policy,
        }
    }

    /// 使用默认重试策略处理请求
    pub async fn run(
        &self,
        request: &RewriteRequest,
        cancel: &CancellationToken,
    ) -> AppResult<RewriteOutcome> {
        self.run_with_policy(request, &self.policy, cancel).await
    }

    /// 使用指定重试策略处理请求
    pub async fn run_with_policy(
        &self,
        request: &RewriteRequest,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> AppResult<RewriteOutcome> {
        validate_request(request)?;

        let ctx = RewriteCtx::next(request.encoding());
        self.log_request(&ctx, request);

        let prompt = build_prompt(request)?;
        let mut tolerance = policy.initial_tolerance;
        let mut failures = 0;

        loop {
            if cancel.is_cancelled() {
                warn!("{} 请求已取消，停止重试", ctx);
                return Err(LlmError::Cancelled.into());
            }

            let attempt = failures + 1;
            info!("{} 🔄 第 {}/{} 次生成尝试", ctx, attempt, policy.max_retries);

            let raw = self
                .provider
                .complete(&prompt, &self.params, cancel)
                .await
                .map_err(|e| fatal(&ctx, e))?;
            let output = parse_response(ctx.encoding, &raw).map_err(|e| fatal(&ctx, e))?;

            let verdict = verify(&request.document, &output, &tolerance);
            if verdict.is_ok() {
                info!("{} ✓ 第 {} 次尝试校验通过", ctx, attempt);
                return Ok(RewriteOutcome {
                    content: output,
                    attempts: attempt,
                    tolerance,
                });
            }

            failures += 1;
            warn!("{} ⚠️ 第 {} 次尝试校验失败: {}", ctx, attempt, verdict);

            if failures >= policy.max_retries {
                error!("{} ❌ 已尝试 {} 次，仍未生成合规内容", ctx, failures);
                return Err(RewriteError::Exhausted { attempts: failures }.into());
            }

            tolerance = policy.tolerance_after(failures);
            debug!(
                "{} 放宽容差: {} 字符 / {:.2}",
                ctx, tolerance.static_allowance, tolerance.percent_allowance
            );
        }
    }

    fn log_request(&self, ctx: &RewriteCtx, request: &RewriteRequest) {
        match &request.document {
            DocumentContent::Text(text) => debug!(
                "{} 收到文本请求: {} 字符",
                ctx,
                text.chars().count()
            ),
            DocumentContent::Structured(document) => debug!(
                "{} 收到结构化请求: {} 个片段 ({} 个固定, {} 个空位)",
                ctx,
                document.len(),
                pinned_texts(&document.segments).len(),
                document.placeholder_count()
            ),
        }
    }
}

/// 检查请求本身是否可处理
pub fn validate_request(request: &RewriteRequest) -> AppResult<()> {
    match &request.document {
        DocumentContent::Text(text) if text.trim().is_empty() => Err(AppError::missing("prompt")),
        DocumentContent::Structured(document) if document.is_empty() => {
            Err(AppError::missing("document"))
        }
        DocumentContent::Structured(document) if document.has_drafts() => Err(
            AppError::invalid_input("draft segments are only allowed in generated output"),
        ),
        _ => Ok(()),
    }
}

fn fatal(ctx: &RewriteCtx, err: AppError) -> AppError {
    error!("{} ❌ 请求终止: {}", ctx, err);
    err
}
