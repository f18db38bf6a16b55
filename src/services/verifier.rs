//! 固定文本完整性校验 - 业务能力层
//!
//! 结构化文档先比较片段数量，再逐位置比较：
//! 1. 输入有非空标题时，输出标题必须逐字符相同
//! 2. 非空固定文本在空白归一化后必须相同
//! 3. 目标长度为正的空位必须有生成文本
//! 4. 生成文本长度与目标长度之差不得超过 `max(固定容差, 生成长度 * 比例容差)`
//!
//! 纯文本只比较标记内的固定片段：数量相同且逐个完全相同，不做归一化，也没有长度容差。

use crate::models::{
    extract_marked_spans, normalize_whitespace, Document, DocumentContent, FailureReason,
    Segment, ToleranceState, VerificationResult,
};

/// 按文档形态选择校验方式
pub fn verify(
    input: &DocumentContent,
    output: &DocumentContent,
    tolerance: &ToleranceState,
) -> VerificationResult {
    match (input, output) {
        (DocumentContent::Text(input), DocumentContent::Text(output)) => {
            verify_pinned_spans(input, output)
        }
        (DocumentContent::Structured(input), DocumentContent::Structured(output)) => {
            verify_segments(input, output, tolerance)
        }
        _ => VerificationResult::failed(None, FailureReason::EncodingMismatch),
    }
}

/// 校验结构化文档
pub fn verify_segments(
    input: &Document,
    output: &Document,
    tolerance: &ToleranceState,
) -> VerificationResult {
    if input.len() != output.len() {
        return VerificationResult::failed(
            None,
            FailureReason::SegmentCountMismatch {
                expected: input.len(),
                actual: output.len(),
            },
        );
    }

    if let Some(title) = input.title.as_deref().filter(|t| !t.is_empty()) {
        if output.title.as_deref() != Some(title) {
            return VerificationResult::failed(Some(0), FailureReason::TitleMismatch);
        }
    }

    for (index, (expected, actual)) in input.segments.iter().zip(&output.segments).enumerate() {
        if let Some(reason) = check_segment(expected, actual, tolerance) {
            return VerificationResult::failed(Some(index), reason);
        }
    }

    VerificationResult::passed()
}

fn check_segment(
    expected: &Segment,
    actual: &Segment,
    tolerance: &ToleranceState,
) -> Option<FailureReason> {
    match expected {
        Segment::Pinned { text } if !text.is_empty() => {
            let output_text = actual.pinned_text().unwrap_or("");
            (normalize_whitespace(text) != normalize_whitespace(output_text))
                .then_some(FailureReason::PinnedAltered)
        }
        Segment::Placeholder { target_length } => match actual.draft_text() {
            None if *target_length > 0 => Some(FailureReason::MissingDraft),
            None => None,
            Some(draft) => check_length(*target_length, draft, tolerance),
        },
        // 空固定文本和输入中的生成文本不做约束
        Segment::Pinned { .. } | Segment::Draft { .. } => None,
    }
}

fn check_length(target: usize, draft: &str, tolerance: &ToleranceState) -> Option<FailureReason> {
    let actual = draft.chars().count();
    let max_diff = tolerance.max_diff(actual);
    let diff = target.abs_diff(actual) as f64;
    (diff > max_diff).then_some(FailureReason::LengthOutOfTolerance {
        target,
        actual,
        max_diff,
    })
}

/// 校验纯文本中的固定片段
pub fn verify_pinned_spans(input: &str, output: &str) -> VerificationResult {
    let expected = extract_marked_spans(input);
    let actual = extract_marked_spans(output);

    if expected.len() != actual.len() {
        return VerificationResult::failed(
            None,
            FailureReason::PinnedSpanCountMismatch {
                expected: expected.len(),
                actual: actual.len(),
            },
        );
    }

    match expected.iter().zip(&actual).position(|(e, a)| e != a) {
        Some(index) => VerificationResult::failed(Some(index), FailureReason::PinnedSpanAltered),
        None => VerificationResult::passed(),
    }
}
