//! 提示词构建 - 业务能力层
//!
//! 把改写请求转换成发送给补全服务的 (system, user) 两条消息。
//! 系统指令按编码方式固定，不随请求变化；风格和模板提示只追加在用户消息开头。

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{DocumentContent, Encoding, RewriteRequest};

/// 纯文本编码的系统指令
pub const TEXT_INSTRUCTION: &str = "You are a writing assistant. The user will send a document in which some passages are pinned. \
Each pinned passage starts with ~< and ends with >~. \
Rewrite only the text outside the markers. \
Copy every pinned passage, together with its ~< and >~ markers, exactly as given, without changing a single character. \
Keep the pinned passages in their original order. \
Keep the total length of the document as close to the original as possible. \
Reply with the rewritten document only.";

/// 结构化编码的系统指令
pub const STRUCTURED_INSTRUCTION: &str = "You are a writing assistant. The user will send a document as a JSON array. \
Each element is an object with a single key: {\"title\": ...} holds the document title, \
{\"pinned\": ...} holds text that must not change, and {\"placeholder\": N} marks a gap of about N characters. \
Replace every placeholder object with exactly one {\"draft\": ...} object whose text is about N characters long and fits the surrounding text. \
Do not edit pinned objects in any way, not even to fix typos, spelling, punctuation or spacing. \
Keep the title unchanged. \
Keep the same number of elements in the same order. \
Reply with the JSON array only, without commentary or code fences.";

/// 发送给补全服务的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// 取得某种编码的系统指令
pub fn instruction_for(encoding: Encoding) -> &'static str {
    match encoding {
        Encoding::Text => TEXT_INSTRUCTION,
        Encoding::Structured => STRUCTURED_INSTRUCTION,
    }
}

/// 构建提示词
pub fn build_prompt(request: &RewriteRequest) -> AppResult<Prompt> {
    let body = match &request.document {
        DocumentContent::Text(text) => text.clone(),
        DocumentContent::Structured(document) => serde_json::to_string(document)
            .map_err(|e| AppError::invalid_input(format!("cannot serialize document: {}", e)))?,
    };

    let mut user = String::new();
    if let Some(style) = non_empty(request.style.as_deref()) {
        user.push_str(&format!("Style: {}\n", style));
    }
    if let Some(template) = non_empty(request.template.as_deref()) {
        user.push_str(&format!("Template: {}\n", template));
    }
    if !user.is_empty() {
        user.push('\n');
    }
    user.push_str(&body);

    debug!(
        "构建提示词: 编码 {}, 用户消息长度 {} 字符",
        request.encoding(),
        user.chars().count()
    );

    Ok(Prompt {
        system: instruction_for(request.encoding()).to_string(),
        user,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
