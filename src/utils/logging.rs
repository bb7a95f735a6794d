/// 日志工具模块
///
/// 日志初始化以及批处理过程中的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 输出；`RUST_LOG` 优先，否则按 verbose 选择 debug/info
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, total_records: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - e-Rehberlik 记录传输");
    info!("🏫 机构代码: {:?}, 机构名称: {:?}", config.school_code, config.school_name);
    info!("📋 待传输记录: {} 条", total_records);
    info!("{}", "=".repeat(60));
}

/// 记录单条记录开始处理
pub fn log_record_start(index: usize, total: usize, student_no: &str) {
    info!("\n{}", "─".repeat(30));
    info!("[记录 {}/{}] 学号: {}", index, total, student_no);
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, report_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    if success + failed < total {
        info!("⏭️ 未处理: {}", total - success - failed);
    }
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
