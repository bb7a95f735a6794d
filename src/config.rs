use std::time::Duration;

use crate::error::ConfigError;
use crate::models::InstitutionIdentity;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户入口地址
    pub entry_url: String,
    /// 机构代码（优先用于学校匹配）
    pub school_code: Option<String>,
    /// 机构名称（代码无法匹配时的后备）
    pub school_name: Option<String>,
    /// 浏览器可执行文件路径，未设置时由 chromiumoxide 自动查找
    pub browser_executable: Option<String>,
    /// 设置后连接已打开的浏览器调试端口，而不是启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 是否无头模式（扫码登录需要可见窗口，默认关闭）
    pub headless: bool,
    /// 等待人工扫码登录的最长时间（秒）
    pub login_timeout_secs: u64,
    /// 代码与名称都无法匹配时，是否退回第一个非行政单位选项
    pub allow_fallback_school: bool,
    /// 待传输记录文件
    pub records_file: String,
    /// 结果报告输出文件
    pub report_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry_url: "https://e-rehberlik.meb.gov.tr/".to_string(),
            school_code: None,
            school_name: None,
            browser_executable: None,
            browser_debug_port: None,
            headless: false,
            login_timeout_secs: 180,
            allow_fallback_school: true,
            records_file: "records.toml".to_string(),
            report_file: "transfer_report.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            entry_url: std::env::var("PORTAL_ENTRY_URL").unwrap_or(default.entry_url),
            school_code: std::env::var("PORTAL_SCHOOL_CODE").ok(),
            school_name: std::env::var("PORTAL_SCHOOL_NAME").ok(),
            browser_executable: std::env::var("PORTAL_BROWSER_PATH").ok(),
            browser_debug_port: parse_env::<u16>("BROWSER_DEBUG_PORT", "u16")?,
            headless: parse_env("PORTAL_HEADLESS", "bool")?.unwrap_or(default.headless),
            login_timeout_secs: parse_env("LOGIN_TIMEOUT_SECS", "u64")?.unwrap_or(default.login_timeout_secs),
            allow_fallback_school: parse_env("ALLOW_FALLBACK_SCHOOL", "bool")?.unwrap_or(default.allow_fallback_school),
            records_file: std::env::var("RECORDS_FILE").unwrap_or(default.records_file),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(default.verbose_logging),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity().code.is_none() && self.identity().name.is_none() {
            return Err(ConfigError::MissingInstitution);
        }
        if self.login_timeout_secs == 0 {
            return Err(ConfigError::ZeroLoginTimeout);
        }
        Ok(())
    }

    pub fn identity(&self) -> InstitutionIdentity {
        InstitutionIdentity::new(self.school_code.clone(), self.school_name.clone())
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

/// 读取并解析环境变量；未设置返回 `None`，无法解析返回错误
fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, &value, expected_type).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: std::str::FromStr>(var_name: &str, value: &str, expected_type: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    })
}
