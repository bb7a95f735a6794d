//! 批处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **加载记录**：从记录文件读取本批待传输的 `SessionRecord`
//! 2. **资源管理**：创建唯一的浏览器驱动和 `AutomationSession`，结束后总是关闭
//! 3. **阶段调度**：初始化 → 等待登录 → 逐条录入
//! 4. **汇总报告**：输出统计并写入报告文件，致命错误返回给调用方

use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::Config;
use crate::infrastructure::{ChromeDriver, Driver};
use crate::models::{load_records, SessionRecord};
use crate::orchestrator::report::BatchReport;
use crate::utils::logging;
use crate::workflow::{AutomationSession, SessionSettings};

/// 应用主结构
pub struct App {
    config: Config,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// 用于外部中止本批（例如 Ctrl-C）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchReport> {
        let records = load_records(Path::new(&self.config.records_file)).await?;
        if records.is_empty() {
            warn!("⚠️ 记录文件中没有待传输的记录，程序结束");
            return Ok(BatchReport::new(&records, Vec::new(), None));
        }

        logging::log_startup(&self.config, records.len());

        let driver = ChromeDriver::from_config(&self.config);
        let mut session = AutomationSession::new(
            driver,
            SessionSettings::from_config(&self.config),
            self.cancel.clone(),
        );

        let report = run_batch(&mut session, &records).await;
        session.close().await;

        report.write(&self.config.report_file)?;
        logging::print_final_stats(
            report.success_count(),
            report.failed_count(),
            report.total,
            &self.config.report_file,
        );

        if let Some(fatal) = &report.fatal {
            anyhow::bail!("批处理中止: {}", fatal);
        }
        Ok(report)
    }
}

/// 在一个会话中走完整批记录
///
/// 不负责关闭会话，调用方在任何结果之后都应调用 `close()`。
pub async fn run_batch<D: Driver>(session: &mut AutomationSession<D>, records: &[SessionRecord]) -> BatchReport {
    let prepared = async {
        session.initialize().await?;
        session.wait_for_login().await
    }
    .await;

    if let Err(e) = prepared {
        error!("❌ 会话准备失败: {}", e);
        return BatchReport::new(records, Vec::new(), Some(e.to_string()));
    }

    match session.process_batch(records).await {
        Ok(results) => BatchReport::new(records, results, None),
        Err(batch) => {
            for entry in batch.results.iter().filter(|r| !r.success) {
                if let Some(err) = &entry.error {
                    warn!("失败原因: {}", logging::truncate_text(err, 120));
                }
            }
            BatchReport::new(records, batch.results, Some(batch.source.to_string()))
        }
    }
}
