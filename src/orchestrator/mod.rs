//! 编排层（Orchestration Layer）
//!
//! 管理应用生命周期：初始化、运行 HTTP 服务、优雅停止。
//!
//! ```text
//! orchestrator::App (服务生命周期)
//!     ↓
//! api (HTTP 路由)
//!     ↓
//! workflow::RewriteFlow (处理单个请求，负责重试)
//!     ↓
//! services (能力层：prompt / parse / verify)  +  clients (补全服务)
//! ```

pub mod app;

pub use app::App;
