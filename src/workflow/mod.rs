//! 流程层（Workflow）
//!
//! 定义"一个改写请求"的完整处理流程：提示词 → 补全 → 解析 → 校验 → 重试

pub mod rewrite_ctx;
pub mod rewrite_flow;

pub use rewrite_ctx::RewriteCtx;
pub use rewrite_flow::{validate_request, RewriteFlow, RewriteOutcome};
