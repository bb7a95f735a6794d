//! 测试用的假页面与假驱动
//!
//! 按脚本模拟门户行为；元素缺失时按超时时间等待，配合 `start_paused` 使用虚拟时钟。

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rehberlik_transfer::services::PortalSelectors;
use rehberlik_transfer::workflow::PortalPaths;
use rehberlik_transfer::{
    AutomationError, Driver, InstitutionIdentity, Locator, PortalPage, Result, SchoolOption, SessionRecord,
    SessionSettings,
};
use tokio_util::sync::CancellationToken;

pub const ENTRY_URL: &str = "https://portal.test/";

#[derive(Default)]
pub struct PageState {
    pub url: String,
    pub url_polls: u32,
    /// 第 n 次读取地址后跳转到落地页
    pub login_after_polls: Option<(u32, String)>,
    pub missing: HashSet<String>,
    pub options: HashMap<String, Vec<SchoolOption>>,
    pub unknown_students: HashSet<String>,
    pub rejected_students: HashMap<String, String>,
    pub disconnect_on_student: Option<String>,
    /// 下拉框前 n 次选择失败
    pub flaky_selects: HashMap<String, u32>,
    /// 点击前 n 次以脚本错误失败（模拟页面回发）
    pub flaky_clicks: HashMap<String, u32>,
    /// 导航到这些地址时失败
    pub fail_goto: HashSet<String>,
    pub current_student: Option<String>,
    pub status: String,
    pub actions: Vec<String>,
}

#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    selectors: PortalSelectors,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState::default())),
            selectors: PortalSelectors::default(),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state().actions.clone()
    }

    pub fn logged_in_to(&self, landing: &str, after_polls: u32) -> &Self {
        self.state().login_after_polls = Some((after_polls, landing.to_string()));
        self
    }

    async fn not_found(expr: &str, timeout: Duration) -> Result<()> {
        tokio::time::sleep(timeout).await;
        Err(AutomationError::ElementNotFound {
            expr: expr.to_string(),
            timeout_ms: timeout.as_millis(),
        })
    }
}

#[async_trait]
impl Locator for FakePage {
    async fn click(&self, expr: &str, timeout: Duration) -> Result<()> {
        let found = {
            let mut st = self.state();
            st.actions.push(format!("click:{}", expr));
            if let Some(remaining) = st.flaky_clicks.get_mut(expr) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AutomationError::Driver("Execution context was destroyed".into()));
                }
            }
            let unknown = expr == self.selectors.student_open
                && st
                    .current_student
                    .as_ref()
                    .is_some_and(|s| st.unknown_students.contains(s));
            let found = !st.missing.contains(expr) && !unknown;
            if found && expr == self.selectors.save {
                let student = st.current_student.clone().unwrap_or_default();
                st.status = st
                    .rejected_students
                    .get(&student)
                    .cloned()
                    .unwrap_or_else(|| self.selectors.success_phrase.clone());
            }
            if found && expr == self.selectors.new_record {
                st.status.clear();
            }
            found
        };
        if found {
            Ok(())
        } else {
            Self::not_found(expr, timeout).await
        }
    }

    async fn wait_for(&self, expr: &str, timeout: Duration) -> Result<()> {
        let found = !self.state().missing.contains(expr);
        if found {
            Ok(())
        } else {
            Self::not_found(expr, timeout).await
        }
    }
}

#[async_trait]
impl PortalPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut st = self.state();
        st.actions.push(format!("goto:{}", url));
        if st.fail_goto.contains(url) {
            return Err(AutomationError::Driver(format!("net::ERR_ABORTED at {}", url)));
        }
        st.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut st = self.state();
        st.url_polls += 1;
        if let Some((after, landing)) = st.login_after_polls.clone() {
            if st.url_polls >= after {
                st.url = landing;
            }
        }
        Ok(st.url.clone())
    }

    async fn fill(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        let found = {
            let mut st = self.state();
            if expr == self.selectors.student_search_input {
                if st.disconnect_on_student.as_deref() == Some(value) {
                    return Err(AutomationError::Disconnected("websocket closed".into()));
                }
                st.current_student = Some(value.to_string());
            }
            st.actions.push(format!("fill:{}={}", expr, value));
            !st.missing.contains(expr)
        };
        if found {
            Ok(())
        } else {
            Self::not_found(expr, timeout).await
        }
    }

    async fn set_value(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        let found = {
            let mut st = self.state();
            st.actions.push(format!("set:{}={}", expr, value));
            !st.missing.contains(expr)
        };
        if found {
            Ok(())
        } else {
            Self::not_found(expr, timeout).await
        }
    }

    async fn select_option(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        let found = {
            let mut st = self.state();
            let flaky = match st.flaky_selects.get_mut(expr) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            let found = !flaky && !st.missing.contains(expr);
            if found {
                st.actions.push(format!("select:{}={}", expr, value));
            }
            found
        };
        if found {
            Ok(())
        } else {
            Self::not_found(expr, timeout).await
        }
    }

    async fn options(&self, expr: &str, timeout: Duration) -> Result<Vec<SchoolOption>> {
        let options = self.state().options.get(expr).cloned();
        match options {
            Some(options) => Ok(options),
            None => Self::not_found(expr, timeout).await.map(|_| Vec::new()),
        }
    }

    async fn text(&self, expr: &str, timeout: Duration) -> Result<String> {
        let text = {
            let st = self.state();
            (expr == self.selectors.status_label).then(|| st.status.clone())
        };
        match text {
            Some(text) => Ok(text),
            None => Self::not_found(expr, timeout).await.map(|_| String::new()),
        }
    }

    async fn is_present(&self, expr: &str) -> Result<bool> {
        Ok(!self.state().missing.contains(expr))
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<()> {
        self.state().actions.push("navigation".to_string());
        Ok(())
    }
}

pub struct FakeDriver {
    pub page: FakePage,
    pub fail_launch: bool,
    pub fail_close: bool,
    pub launches: u32,
    pub close_pages_calls: u32,
    pub shutdowns: u32,
}

impl FakeDriver {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail_launch: false,
            fail_close: false,
            launches: 0,
            close_pages_calls: 0,
            shutdowns: 0,
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type Page = FakePage;

    async fn launch(&mut self, entry_url: &str, _cancel: &CancellationToken) -> Result<FakePage> {
        self.launches += 1;
        if self.fail_launch {
            return Err(AutomationError::Initialization("chrome not found".into()));
        }
        self.page.state().url = entry_url.to_string();
        Ok(self.page.clone())
    }

    async fn close_pages(&mut self) -> Result<()> {
        self.close_pages_calls += 1;
        if self.fail_close {
            return Err(AutomationError::Driver("target closed".into()));
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns += 1;
        if self.fail_close {
            return Err(AutomationError::Disconnected("browser gone".into()));
        }
        Ok(())
    }
}

pub fn settings(code: Option<&str>, name: Option<&str>) -> SessionSettings {
    SessionSettings {
        entry_url: ENTRY_URL.to_string(),
        identity: InstitutionIdentity::new(code.map(String::from), name.map(String::from)),
        login_timeout: Duration::from_secs(180),
        login_poll: Duration::from_secs(1),
        allow_fallback_school: true,
        selectors: PortalSelectors::default(),
        paths: PortalPaths::from_entry(ENTRY_URL),
    }
}

pub fn record(student_no: &str) -> SessionRecord {
    SessionRecord {
        student_no: student_no.to_string(),
        service_area: "2".to_string(),
        primary_category: "21".to_string(),
        secondary_category: "213".to_string(),
        tertiary_category: None,
        meeting_date: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 40, 0).unwrap(),
        workplace: "1".to_string(),
        session_count: 1,
    }
}

pub fn home_url() -> String {
    format!("{}Anasayfa.aspx", ENTRY_URL)
}

pub fn school_selection_url() -> String {
    format!("{}KurumSecim.aspx", ENTRY_URL)
}
