//! 文档片段模型
//!
//! 一篇文档是有序的片段序列，可选带一个标题。
//! 线上（JSON）形式是单键对象数组：
//!
//! ```text
//! [{"title": "..."}, {"pinned": "..."}, {"placeholder": 40}, {"draft": "..."}]
//! ```
//!
//! `title` 只允许出现在第一个位置。

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// 文档片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 固定文本，输出中必须原样保留（允许空白差异）
    Pinned { text: String },
    /// 待生成的空位，目标长度按字符计
    Placeholder { target_length: usize },
    /// 模型为空位生成的文本，只出现在输出文档中
    Draft { text: String },
}

impl Segment {
    pub fn pinned(text: impl Into<String>) -> Self {
        Segment::Pinned { text: text.into() }
    }

    pub fn placeholder(target_length: usize) -> Self {
        Segment::Placeholder { target_length }
    }

    pub fn draft(text: impl Into<String>) -> Self {
        Segment::Draft { text: text.into() }
    }

    /// 固定文本（非 Pinned 时为 None）
    pub fn pinned_text(&self) -> Option<&str> {
        match self {
            Segment::Pinned { text } => Some(text),
            _ => None,
        }
    }

    /// 生成文本（非 Draft 时为 None）
    pub fn draft_text(&self) -> Option<&str> {
        match self {
            Segment::Draft { text } => Some(text),
            _ => None,
        }
    }

    /// 空位目标长度（非 Placeholder 时为 None）
    pub fn target_length(&self) -> Option<usize> {
        match self {
            Segment::Placeholder { target_length } => Some(*target_length),
            _ => None,
        }
    }
}

/// 文档
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: Option<String>,
    pub segments: Vec<Segment>,
}

impl Document {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            title: None,
            segments,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 片段数量（不含标题）
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// 没有任何片段（只有标题也算空）
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder { .. }))
            .count()
    }

    pub fn has_drafts(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Draft { .. }))
    }

    fn from_wire(items: Vec<WireItem>) -> Result<Self, String> {
        let mut document = Document::default();
        for (index, item) in items.into_iter().enumerate() {
            match item {
                WireItem::Title(title) if index == 0 => document.title = Some(title),
                WireItem::Title(_) => {
                    return Err(format!(
                        "title element must be the first element, found at index {}",
                        index
                    ))
                }
                WireItem::Pinned(text) => document.segments.push(Segment::Pinned { text }),
                WireItem::Placeholder(target_length) => document
                    .segments
                    .push(Segment::Placeholder { target_length }),
                WireItem::Draft(text) => document.segments.push(Segment::Draft { text }),
            }
        }
        Ok(document)
    }
}

// ========== 线上格式 ==========

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireItem {
    Title(String),
    Pinned(String),
    Placeholder(usize),
    Draft(String),
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum WireItemRef<'a> {
    Title(&'a str),
    Pinned(&'a str),
    Placeholder(usize),
    Draft(&'a str),
}

impl<'a> From<&'a Segment> for WireItemRef<'a> {
    fn from(segment: &'a Segment) -> Self {
        match segment {
            Segment::Pinned { text } => WireItemRef::Pinned(text),
            Segment::Placeholder { target_length } => WireItemRef::Placeholder(*target_length),
            Segment::Draft { text } => WireItemRef::Draft(text),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.segments.len() + usize::from(self.title.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        if let Some(title) = &self.title {
            seq.serialize_element(&WireItemRef::Title(title))?;
        }
        for segment in &self.segments {
            seq.serialize_element(&WireItemRef::from(segment))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<WireItem>::deserialize(deserializer)?;
        Document::from_wire(items).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_array() {
        let doc: Document = serde_json::from_value(json!([
            {"title": "Energy"},
            {"pinned": "solar power"},
            {"placeholder": 40},
            {"draft": "is cheap"}
        ]))
        .unwrap();

        assert_eq!(doc.title.as_deref(), Some("Energy"));
        assert_eq!(
            doc.segments,
            vec![
                Segment::pinned("solar power"),
                Segment::placeholder(40),
                Segment::draft("is cheap"),
            ]
        );
        assert_eq!(doc.placeholder_count(), 1);
        assert!(doc.has_drafts());
    }

    #[test]
    fn test_serialize_keeps_order_and_title_first() {
        let doc = Document::new(vec![Segment::placeholder(12), Segment::pinned("wind")])
            .with_title("Power");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!([{"title": "Power"}, {"placeholder": 12}, {"pinned": "wind"}])
        );
    }

    #[test]
    fn test_title_not_first_is_rejected() {
        let result: Result<Document, _> =
            serde_json::from_value(json!([{"pinned": "a"}, {"title": "late"}]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("index 1"), "{}", err);
    }

    #[test]
    fn test_ambiguous_or_unknown_objects_are_rejected() {
        // 同一个对象同时是 pinned 和 placeholder
        assert!(serde_json::from_value::<Document>(json!([{"pinned": "a", "placeholder": 3}]))
            .is_err());
        assert!(serde_json::from_value::<Document>(json!([{"quote": "a"}])).is_err());
        assert!(serde_json::from_value::<Document>(json!([{"placeholder": -4}])).is_err());
        assert!(serde_json::from_value::<Document>(json!({"pinned": "a"})).is_err());
    }

    #[test]
    fn test_empty_document() {
        let doc: Document = serde_json::from_str("[]").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 0);

        let title_only: Document = serde_json::from_str(r#"[{"title":"Energy"}]"#).unwrap();
        assert_eq!(title_only.title.as_deref(), Some("Energy"));
        assert!(title_only.is_empty());
    }
}
