//! API 模块
//!
//! 对外暴露的 HTTP 接口，只负责请求解析和响应格式，业务交给 workflow

pub mod routes;

pub use routes::{router, ApiState};
