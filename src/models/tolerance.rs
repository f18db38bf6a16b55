//! 长度容差与重试策略

use serde::Deserialize;

/// 默认固定容差（字符）
pub const DEFAULT_STATIC_ALLOWANCE: usize = 100;
/// 默认比例容差（相对生成文本长度）
pub const DEFAULT_PERCENT_ALLOWANCE: f64 = 0.7;
/// 默认最大尝试次数
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// 默认容差增长倍数
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// 比例容差乘积的相对误差上限
const PRODUCT_EPSILON: f64 = 1e-9;

/// 空位与生成文本之间允许的长度偏差
///
/// 每个请求从初始值开始，每次校验失败后按倍数放宽，请求结束即丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ToleranceState {
    pub static_allowance: usize,
    pub percent_allowance: f64,
}

impl Default for ToleranceState {
    fn default() -> Self {
        Self {
            static_allowance: DEFAULT_STATIC_ALLOWANCE,
            percent_allowance: DEFAULT_PERCENT_ALLOWANCE,
        }
    }
}

impl ToleranceState {
    pub fn new(static_allowance: usize, percent_allowance: f64) -> Self {
        Self {
            static_allowance,
            percent_allowance,
        }
    }

    /// 不允许任何偏差
    pub fn zero() -> Self {
        Self::new(0, 0.0)
    }

    /// 两个字段同时乘以增长倍数
    pub fn grown(&self, factor: f64) -> Self {
        Self {
            static_allowance: (self.static_allowance as f64 * factor).round() as usize,
            percent_allowance: self.percent_allowance * factor,
        }
    }

    /// 针对某个生成文本长度的最大允许偏差
    ///
    /// 比例部分在浮点误差范围内贴近整数时取该整数，
    /// 例如 170 × 0.7 得到 118.99999999999999，按 119 计。
    pub fn max_diff(&self, draft_length: usize) -> f64 {
        let by_percent = snap_to_integer(draft_length as f64 * self.percent_allowance);
        (self.static_allowance as f64).max(by_percent)
    }
}

fn snap_to_integer(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() <= PRODUCT_EPSILON * nearest.abs().max(1.0) {
        nearest
    } else {
        value
    }
}

/// 重试策略
///
/// 由配置生成，也可以按调用覆盖。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 最大尝试次数（校验失败计数达到该值即放弃）
    pub max_retries: usize,
    /// 每次失败后容差的增长倍数
    pub growth_factor: f64,
    /// 每个请求的初始容差
    pub initial_tolerance: ToleranceState,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            initial_tolerance: ToleranceState::default(),
        }
    }
}

impl RetryPolicy {
    /// 经历 `failures` 次校验失败后的容差
    pub fn tolerance_after(&self, failures: usize) -> ToleranceState {
        (0..failures).fold(self.initial_tolerance, |tolerance, _| {
            tolerance.grown(self.growth_factor)
        })
    }
}
