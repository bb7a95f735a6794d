use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RecordError;

/// 一次辅导/咨询会谈记录，对应门户中的一条数据录入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// 学生学号（不能为空）
    pub student_no: String,
    /// 服务领域代码
    pub service_area: String,
    /// 一级类别代码
    pub primary_category: String,
    /// 二级类别代码
    pub secondary_category: String,
    /// 三级类别代码（门户不一定提供）
    #[serde(default)]
    pub tertiary_category: Option<String>,
    /// 会谈日期
    pub meeting_date: NaiveDate,
    /// 开始时间
    #[serde(deserialize_with = "de_clock_time")]
    pub start_time: NaiveTime,
    /// 结束时间
    #[serde(deserialize_with = "de_clock_time")]
    pub end_time: NaiveTime,
    /// 工作地点代码
    pub workplace: String,
    /// 会谈次数
    pub session_count: u32,
}

impl SessionRecord {
    /// 本地可校验的约束；各类代码只由门户在运行时校验
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.student_no.trim().is_empty() {
            return Err(RecordError::Invalid("学号为空".to_string()));
        }
        if self.session_count == 0 {
            return Err(RecordError::Invalid("会谈次数必须为正整数".to_string()));
        }
        Ok(())
    }

    /// 门户日期框格式 (dd.mm.yyyy)
    pub fn portal_date(&self) -> String {
        self.meeting_date.format("%d.%m.%Y").to_string()
    }

    pub fn portal_start_time(&self) -> String {
        self.start_time.format("%H:%M").to_string()
    }

    pub fn portal_end_time(&self) -> String {
        self.end_time.format("%H:%M").to_string()
    }
}

/// 接受 "HH:MM" 和 "HH:MM:SS" 两种写法
fn de_clock_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| serde::de::Error::custom(format!("无效时间 '{}': {}", raw, e)))
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: RecordError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
        }
    }
}

/// 调用方提供的机构身份，只在学校选择时使用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionIdentity {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl InstitutionIdentity {
    pub fn new(code: Option<String>, name: Option<String>) -> Self {
        // 空字符串等同于未提供
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            code: clean(code),
            name: clean(name),
        }
    }
}

/// 门户下拉框中的一个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolOption {
    pub code: String,
    pub label: String,
}

impl SchoolOption {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}
