//! 批处理报告

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;

use crate::models::{RecordResult, SessionRecord};

/// 单条记录在报告中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub student_no: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一批记录的处理报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// 输入记录总数
    pub total: usize,
    /// 已处理记录的结果，与输入顺序一致
    pub entries: Vec<ReportEntry>,
    /// 中止本批的致命错误
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl BatchReport {
    pub fn new(records: &[SessionRecord], results: Vec<RecordResult>, fatal: Option<String>) -> Self {
        let entries = records
            .iter()
            .zip(results)
            .map(|(record, result)| ReportEntry {
                student_no: record.student_no.clone(),
                success: result.success,
                error: result.error,
            })
            .collect();
        Self {
            total: records.len(),
            entries,
            fatal,
        }
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.success_count()
    }

    /// 所有记录都已处理（不论成功与否）
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && self.entries.len() == self.total
    }

    pub fn write(&self, path: &str) -> Result<()> {
        let body = serde_json::to_string_pretty(self).context("无法序列化报告")?;
        fs::write(path, body).with_context(|| format!("无法写入报告文件: {}", path))?;
        Ok(())
    }
}
