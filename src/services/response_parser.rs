//! 响应解析 - 业务能力层
//!
//! 把补全服务返回的原始文本转换回与输入相同的文档形态。
//! 结构化响应解析失败属于致命错误，不进入重试。

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentContent, Encoding};
use crate::utils::truncate_text;

/// 按输入的编码方式解析原始响应
pub fn parse_response(encoding: Encoding, raw: &str) -> AppResult<DocumentContent> {
    match encoding {
        Encoding::Text => Ok(DocumentContent::Text(raw.trim().to_string())),
        Encoding::Structured => parse_segments(raw).map(DocumentContent::Structured),
    }
}

/// 解析片段数组
pub fn parse_segments(raw: &str) -> AppResult<Document> {
    let body = strip_code_fence(raw);
    let document: Document = serde_json::from_str(body)
        .map_err(|e| AppError::malformed(e.to_string(), truncate_text(raw, 120)))?;

    debug!(
        "解析结构化响应: {} 个片段, 标题: {:?}",
        document.len(),
        document.title
    );

    Ok(document)
}

/// 去掉包裹在外层的 markdown 代码块
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // 第一行是语言标记（或为空）时跳过
    match inner.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag) => body.trim(),
        _ => inner.trim(),
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}
