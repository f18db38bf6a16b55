/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 改写服务启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 监听地址: {}", config.bind_addr);
    info!("🤖 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!(
        "🔁 最大尝试次数: {}, 初始容差: {} 字符 / {:.0}%, 增长倍数: {}",
        config.max_retries,
        config.tolerance_static,
        config.tolerance_percent * 100.0,
        config.tolerance_growth
    );
    info!("⏱️ 单次调用超时: {} 秒", config.llm_timeout_secs);
    info!("{}", "=".repeat(60));
}

/// 记录服务停止信息
pub fn log_shutdown() {
    info!("\n{}", "─".repeat(60));
    info!(
        "🛑 改写服务停止 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("太阳能发电", 2), "太阳...");
    }
}
