//! 固定文本提取
//!
//! 两种文档形态各有一种提取方式：
//! - 片段数组：按顺序取出所有 `Pinned` 片段的文本
//! - 纯文本：`~<` 与 `>~` 之间的内容视为固定文本

use std::sync::LazyLock;

use regex::Regex;

use crate::models::segment::Segment;

static MARKED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)~<(.*?)>~").expect("marker pattern is valid"));

/// 把连续空白压缩成一个空格，并去掉首尾空白
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按顺序取出片段数组中的固定文本
pub fn pinned_texts(segments: &[Segment]) -> Vec<&str> {
    segments.iter().filter_map(Segment::pinned_text).collect()
}

/// 按顺序取出纯文本中被标记包围的固定文本（不含标记本身，不做空白归一化）
pub fn extract_marked_spans(text: &str) -> Vec<String> {
    MARKED_SPAN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
