//! # Pairwrit Backend
//!
//! 固定文本约束下的 LLM 改写服务
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据模型（Models）
//! - `models/` - 文档片段、编码方式、容差状态、校验结果
//!
//! ### ② 业务能力层（Services + Clients）
//! - `services/` - 描述"我能做什么"，每个函数只处理一次调用
//! - `prompt_service` - 构建提示词
//! - `response_parser` - 解析模型输出
//! - `verifier` - 校验固定文本是否被改动、生成长度是否合适
//! - `clients/` - OpenAI 兼容接口的补全客户端
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个请求"的完整处理流程
//! - `RewriteCtx` - 上下文封装（请求编号 + 编码方式）
//! - `RewriteFlow` - 流程编排（prompt → complete → parse → verify → retry）
//!
//! ### ④ 接口与编排层（API + Orchestration）
//! - `api/` - HTTP 路由
//! - `orchestrator/` - 应用生命周期
//!
//! ## 模块结构

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CompletionProvider, LlmClient, ModelParams};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Document, DocumentContent, Encoding, RetryPolicy, RewriteRequest, Segment};
pub use orchestrator::App;
pub use workflow::{RewriteFlow, RewriteOutcome};
