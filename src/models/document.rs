//! 改写请求与文档内容

use std::fmt;

use serde::Serialize;

use crate::models::segment::Document;

/// 文档编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 纯文本，固定文本用 `~<` `>~` 标记
    Text,
    /// 片段数组
    Structured,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Text => write!(f, "text"),
            Encoding::Structured => write!(f, "structured"),
        }
    }
}

/// 文档内容，输入和输出共用同一形态
///
/// 序列化时纯文本为 JSON 字符串，结构化文档为片段数组。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Text(String),
    Structured(Document),
}

impl DocumentContent {
    pub fn encoding(&self) -> Encoding {
        match self {
            DocumentContent::Text(_) => Encoding::Text,
            DocumentContent::Structured(_) => Encoding::Structured,
        }
    }
}

/// 一次改写请求
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub document: DocumentContent,
    /// 风格提示，例如 "formal"
    pub style: Option<String>,
    /// 模板提示，例如 "blog post"
    pub template: Option<String>,
}

impl RewriteRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            document: DocumentContent::Text(text.into()),
            style: None,
            template: None,
        }
    }

    pub fn structured(document: Document) -> Self {
        Self {
            document: DocumentContent::Structured(document),
            style: None,
            template: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.document.encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::segment::Segment;
    use serde_json::json;

    #[test]
    fn test_content_serializes_in_its_own_encoding() {
        let text = DocumentContent::Text("hello ~<world>~".to_string());
        assert_eq!(serde_json::to_value(&text).unwrap(), json!("hello ~<world>~"));

        let doc = DocumentContent::Structured(Document::new(vec![Segment::draft("hi")]));
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!([{"draft": "hi"}]));
    }

    #[test]
    fn test_request_builders() {
        let request = RewriteRequest::text("abc")
            .with_style("formal")
            .with_template("essay");
        assert_eq!(request.encoding(), Encoding::Text);
        assert_eq!(request.style.as_deref(), Some("formal"));
        assert_eq!(request.template.as_deref(), Some("essay"));

        let request = RewriteRequest::structured(Document::default());
        assert_eq!(request.encoding(), Encoding::Structured);
    }
}
