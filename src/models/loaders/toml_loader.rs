use crate::models::record::SessionRecord;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 待传输记录文件的结构
///
/// ```toml
/// [[records]]
/// student_no = "1024"
/// ...
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RecordFile {
    #[serde(default)]
    pub records: Vec<SessionRecord>,
}

/// 从 TOML 文件加载一批记录，保持文件中的顺序
pub async fn load_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        anyhow::bail!("记录文件不存在: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取记录文件: {}", path.display()))?;

    let file: RecordFile = toml::from_str(&content)
        .with_context(|| format!("无法解析记录文件: {}", path.display()))?;

    tracing::info!(
        "从 {} 加载了 {} 条记录",
        path.file_name().unwrap_or_default().to_string_lossy(),
        file.records.len()
    );

    Ok(file.records)
}
