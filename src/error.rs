use thiserror::Error;

use crate::models::RecordResult;
use crate::workflow::SessionState;

/// 自动化流程错误类型
///
/// 前四个变体是致命错误，会中止整批处理；
/// `ElementNotFound` 只在内部出现，离开会话前总会被包装成带上下文的错误。
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 浏览器无法启动或入口页面不可达
    #[error("初始化失败: {0}")]
    Initialization(String),

    /// 登录超时或跳转到未知页面
    #[error("登录失败: {0}")]
    Login(String),

    /// 没有任何学校选项满足匹配规则
    #[error("学校选择失败: {0}")]
    SchoolSelection(String),

    /// 菜单导航在重试后仍失败
    #[error("导航失败: {0}")]
    Navigation(String),

    /// 在超时时间内未找到元素
    #[error("元素未找到 (等待 {timeout_ms}ms): {expr}")]
    ElementNotFound { expr: String, timeout_ms: u128 },

    /// 重试次数用尽
    #[error("{label}: 已尝试 {attempts} 次仍失败, 最后一次错误: {last}")]
    RetryExhausted {
        label: String,
        attempts: u32,
        #[source]
        last: Box<AutomationError>,
    },

    /// 页面脚本或驱动调用失败
    #[error("浏览器驱动错误: {0}")]
    Driver(String),

    /// 与浏览器的连接已断开
    #[error("浏览器连接已断开: {0}")]
    Disconnected(String),

    /// 外部取消
    #[error("操作已取消")]
    Cancelled,

    /// 会话状态不允许当前操作
    #[error("会话状态错误: 期望 {expected}, 实际 {actual:?}")]
    InvalidState {
        expected: &'static str,
        actual: SessionState,
    },
}

impl AutomationError {
    /// 是否属于基础设施层面的失败（不能被单条记录吸收）
    pub fn is_infrastructure(&self) -> bool {
        match self {
            AutomationError::Cancelled | AutomationError::Disconnected(_) => true,
            AutomationError::RetryExhausted { last, .. } => last.is_infrastructure(),
            _ => false,
        }
    }

    /// 是否允许重试
    pub fn is_retryable(&self) -> bool {
        !self.is_infrastructure()
    }
}

impl From<chromiumoxide::error::CdpError> for AutomationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                AutomationError::Disconnected(err.to_string())
            }
            other => AutomationError::Driver(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Driver(format!("脚本返回值解析失败: {}", err))
    }
}

/// 单条记录的失败原因，最终写入 `RecordResult.error`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("student not found")]
    StudentNotFound,

    #[error("save rejected: {0}")]
    SaveRejected(String),

    #[error("populate {field}: {detail}")]
    Populate { field: &'static str, detail: String },

    #[error("invalid record: {0}")]
    Invalid(String),

    /// 保存前状态标签仍显示上一条记录的成功提示
    #[error("stale status: previous save message still shown")]
    StaleStatus,
}

/// 批处理被致命错误中止，已完成的记录结果保留在 `results` 中
#[derive(Debug, Error)]
#[error("批处理在 {} 条记录后中止: {source}", .results.len())]
pub struct BatchError {
    pub results: Vec<RecordResult>,
    #[source]
    pub source: AutomationError,
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 学校代码和学校名称都未配置
    #[error("必须至少配置 PORTAL_SCHOOL_CODE 或 PORTAL_SCHOOL_NAME 之一")]
    MissingInstitution,

    /// 登录等待时间为 0
    #[error("LOGIN_TIMEOUT_SECS 必须大于 0")]
    ZeroLoginTimeout,
}

/// 自动化结果类型
pub type Result<T> = std::result::Result<T, AutomationError>;
