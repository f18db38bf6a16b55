//! 改写请求上下文
//!
//! 封装"我正在处理哪一个请求"这一信息，只用于日志

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::Encoding;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// 改写请求上下文
#[derive(Debug, Clone)]
pub struct RewriteCtx {
    /// 进程内递增的请求编号
    pub request_id: u64,
    /// 文档编码方式
    pub encoding: Encoding,
}

impl RewriteCtx {
    /// 为新请求分配编号
    pub fn next(encoding: Encoding) -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            encoding,
        }
    }
}

impl Display for RewriteCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[请求 #{} {}]", self.request_id, self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let a = RewriteCtx::next(Encoding::Text);
        let b = RewriteCtx::next(Encoding::Structured);
        assert!(b.request_id > a.request_id);
        assert_eq!(b.to_string(), format!("[请求 #{} structured]", b.request_id));
    }
}
