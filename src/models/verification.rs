//! 校验结果

use std::fmt;

/// 校验失败原因
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// 输入输出片段数量不一致
    SegmentCountMismatch { expected: usize, actual: usize },
    /// 标题被改动
    TitleMismatch,
    /// 固定文本被改动
    PinnedAltered,
    /// 空位没有对应的生成文本
    MissingDraft,
    /// 生成文本长度超出容差
    LengthOutOfTolerance {
        target: usize,
        actual: usize,
        max_diff: f64,
    },
    /// 纯文本中固定片段数量不一致
    PinnedSpanCountMismatch { expected: usize, actual: usize },
    /// 纯文本中固定片段被改动
    PinnedSpanAltered,
    /// 输入和输出的编码形态不一致
    EncodingMismatch,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SegmentCountMismatch { expected, actual } => {
                write!(f, "片段数量不一致: 期望 {}, 实际 {}", expected, actual)
            }
            FailureReason::TitleMismatch => write!(f, "标题被改动"),
            FailureReason::PinnedAltered => write!(f, "固定文本被改动"),
            FailureReason::MissingDraft => write!(f, "空位缺少生成文本"),
            FailureReason::LengthOutOfTolerance {
                target,
                actual,
                max_diff,
            } => write!(
                f,
                "生成长度超出容差: 目标 {}, 实际 {}, 允许偏差 {:.1}",
                target, actual, max_diff
            ),
            FailureReason::PinnedSpanCountMismatch { expected, actual } => {
                write!(f, "固定片段数量不一致: 期望 {}, 实际 {}", expected, actual)
            }
            FailureReason::PinnedSpanAltered => write!(f, "固定片段被改动"),
            FailureReason::EncodingMismatch => write!(f, "输入输出编码不一致"),
        }
    }
}

/// 单次校验结果，每次尝试重新生成
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub ok: bool,
    pub failure_index: Option<usize>,
    pub reason: Option<FailureReason>,
}

impl VerificationResult {
    pub fn passed() -> Self {
        Self {
            ok: true,
            failure_index: None,
            reason: None,
        }
    }

    pub fn failed(failure_index: Option<usize>, reason: FailureReason) -> Self {
        Self {
            ok: false,
            failure_index,
            reason: Some(reason),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, self.failure_index) {
            (None, _) => write!(f, "校验通过"),
            (Some(reason), Some(index)) => write!(f, "位置 {}: {}", index, reason),
            (Some(reason), None) => write!(f, "{}", reason),
        }
    }
}
