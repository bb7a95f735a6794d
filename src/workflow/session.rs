//! 门户会话 - 流程层
//!
//! 一个 `AutomationSession` 对应一批记录：独占一个浏览器页面，
//! 驱动 初始化 → 等待登录 → 选校 → 进入录入页 → 逐条录入 的状态机。
//!
//! ```text
//! Uninitialized ─initialize()─▶ Initializing ─wait_for_login()─▶ AwaitingLogin
//!     ─▶ (SelectingSchool) ─▶ NavigatingToForm ─▶ Ready ⇄ ProcessingRecord
//! 任意阶段 ─▶ Failed；close() 在任何状态下都可调用并回到 Uninitialized
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AutomationError, BatchError, Result};
use crate::infrastructure::{Driver, Locator, PortalPage};
use crate::models::{InstitutionIdentity, RecordResult, SessionRecord};
use crate::services::{PortalSelectors, RecordFiller, SchoolResolver};
use crate::utils::logging;
use crate::utils::retry::{retry, sleep_or_cancel, RetryPolicy};
use crate::workflow::landing::{classify_landing, Landing, PortalPaths};

const LOGIN_AFFORDANCE_TIMEOUT: Duration = Duration::from_secs(15);
const MENU_TIMEOUT: Duration = Duration::from_secs(10);
const FORM_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    AwaitingLogin,
    SelectingSchool,
    NavigatingToForm,
    Ready,
    ProcessingRecord,
    /// 仅在 close() 执行期间出现
    Closed,
    Failed,
}

/// 会话参数
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub entry_url: String,
    pub identity: InstitutionIdentity,
    /// 等待人工扫码的截止时间
    pub login_timeout: Duration,
    /// 登录期间检查地址的间隔
    pub login_poll: Duration,
    pub allow_fallback_school: bool,
    pub selectors: PortalSelectors,
    pub paths: PortalPaths,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            entry_url: config.entry_url.clone(),
            identity: config.identity(),
            login_timeout: config.login_timeout(),
            login_poll: Duration::from_secs(1),
            allow_fallback_school: config.allow_fallback_school,
            selectors: PortalSelectors::default(),
            paths: PortalPaths::from_entry(&config.entry_url),
        }
    }
}

/// 门户自动化会话
pub struct AutomationSession<D: Driver> {
    driver: D,
    page: Option<D::Page>,
    state: SessionState,
    settings: SessionSettings,
    resolver: SchoolResolver,
    filler: RecordFiller,
    cancel: CancellationToken,
}

impl<D: Driver> AutomationSession<D> {
    pub fn new(driver: D, settings: SessionSettings, cancel: CancellationToken) -> Self {
        let resolver = SchoolResolver::new(settings.selectors.clone(), settings.allow_fallback_school);
        let filler = RecordFiller::new(settings.selectors.clone());
        Self {
            driver,
            page: None,
            state: SessionState::Uninitialized,
            settings,
            resolver,
            filler,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 启动浏览器并打开门户入口
    pub async fn initialize(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Uninitialized], "Uninitialized")?;
        self.state = SessionState::Initializing;
        info!("🌐 正在打开门户: {}", self.settings.entry_url);

        match self.driver.launch(&self.settings.entry_url, &self.cancel).await {
            Ok(page) => {
                self.page = Some(page);
                Ok(())
            }
            Err(e) => Err(self.fail(within("启动浏览器", e, AutomationError::Initialization))),
        }
    }

    /// 触发扫码登录并等待人工完成，随后选校并进入录入页面
    pub async fn wait_for_login(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Initializing], "Initializing")?;
        self.state = SessionState::AwaitingLogin;

        let landing = match self.await_login().await {
            Ok(landing) => landing,
            Err(e) => return Err(self.fail(e)),
        };

        if landing == Landing::SchoolSelection {
            self.state = SessionState::SelectingSchool;
            if let Err(e) = self.select_school().await {
                return Err(self.fail(e));
            }
        }

        self.state = SessionState::NavigatingToForm;
        self.navigate_to_data_entry().await
    }

    /// 依次点击两个菜单项进入录入表单
    pub async fn navigate_to_data_entry(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::NavigatingToForm], "NavigatingToForm")?;

        match self.open_data_entry().await {
            Ok(()) => {
                self.state = SessionState::Ready;
                info!("✅ 录入页面已就绪");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 录入一条记录；单条失败体现在返回值中，`Err` 表示会话已不可用
    pub async fn process_record(&mut self, record: &SessionRecord) -> Result<RecordResult> {
        self.expect_state(&[SessionState::Ready], "Ready")?;
        let Some(page) = self.page.as_ref() else {
            return Err(self.fail(AutomationError::Driver("页面句柄缺失".to_string())));
        };
        self.state = SessionState::ProcessingRecord;

        match self.filler.fill(page, record, &self.cancel).await {
            Ok(result) => {
                self.state = SessionState::Ready;
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 按顺序录入一批记录，结果与输入一一对应
    ///
    /// 遇到致命错误时中止，已经得到的结果随 `BatchError` 一起返回。
    pub async fn process_batch(
        &mut self,
        records: &[SessionRecord],
    ) -> std::result::Result<Vec<RecordResult>, BatchError> {
        let total = records.len();
        let mut results = Vec::with_capacity(total);

        for (index, record) in records.iter().enumerate() {
            logging::log_record_start(index + 1, total, &record.student_no);
            match self.process_record(record).await {
                Ok(result) => results.push(result),
                Err(source) => {
                    error!(
                        "❌ 第 {}/{} 条记录处理时发生致命错误，中止本批: {}",
                        index + 1,
                        total,
                        source
                    );
                    return Err(BatchError { results, source });
                }
            }
        }

        Ok(results)
    }

    /// 关闭页面和浏览器，任何状态下都可调用，从不返回错误
    pub async fn close(&mut self) {
        debug!("关闭会话 (当前状态: {:?})", self.state);
        self.state = SessionState::Closed;

        if let Err(e) = self.driver.close_pages().await {
            warn!("关闭页面失败: {}", e);
        }
        self.page = None;
        if let Err(e) = self.driver.shutdown().await {
            warn!("关闭浏览器失败: {}", e);
        }

        self.state = SessionState::Uninitialized;
    }

    // ========== 各阶段 ==========

    async fn await_login(&self) -> Result<Landing> {
        let page = self.page()?;
        page.click(&self.settings.selectors.login_qr, LOGIN_AFFORDANCE_TIMEOUT)
            .await
            .map_err(|e| within("打开扫码登录", e, AutomationError::Login))?;

        info!(
            "📱 请用手机扫描二维码完成登录（最长等待 {} 秒）...",
            self.settings.login_timeout.as_secs()
        );

        let deadline = Instant::now() + self.settings.login_timeout;
        let mut last_url = String::new();
        loop {
            match page.current_url().await {
                Ok(url) => {
                    if let Some(landing) = classify_landing(&url) {
                        info!("✓ 登录成功，落地页: {}", url);
                        return Ok(landing);
                    }
                    last_url = url;
                }
                Err(e) if e.is_infrastructure() => return Err(e),
                Err(e) => debug!("读取当前地址失败: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AutomationError::Login(format!(
                    "{} 秒内未跳转到已知的登录后页面 (当前: {})",
                    self.settings.login_timeout.as_secs(),
                    last_url
                )));
            }
            sleep_or_cancel(self.settings.login_poll.min(deadline - now), &self.cancel).await?;
        }
    }

    async fn select_school(&self) -> Result<()> {
        let page = self.page()?;
        self.resolver.select(page, &self.settings.identity).await?;

        let paths = &self.settings.paths;
        page.goto(&paths.home_url)
            .await
            .map_err(|e| within("打开主页", e, AutomationError::Navigation))?;
        page.goto(&paths.data_entry_menu_url)
            .await
            .map_err(|e| within("打开录入菜单页", e, AutomationError::Navigation))
    }

    async fn open_data_entry(&self) -> Result<()> {
        let page = self.page()?;
        let selectors = &self.settings.selectors;
        let policy = RetryPolicy::fixed(2, Duration::from_secs(1));

        for entry in selectors.menu_entries.iter() {
            let label = format!("菜单 {}", entry);
            let target = entry.as_str();
            retry(policy, &label, &self.cancel, move || async move {
                page.click(target, MENU_TIMEOUT).await
            })
            .await
            .map_err(|e| within("进入录入页面", e, AutomationError::Navigation))?;
        }

        page.wait_for(&selectors.student_search_input, FORM_READY_TIMEOUT)
            .await
            .map_err(|e| within("等待录入表单", e, AutomationError::Navigation))
    }

    // ========== 辅助方法 ==========

    fn page(&self) -> Result<&D::Page> {
        self.page.as_ref().ok_or(AutomationError::InvalidState {
            expected: "页面已打开",
            actual: self.state,
        })
    }

    fn expect_state(&self, allowed: &[SessionState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AutomationError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn fail(&mut self, err: AutomationError) -> AutomationError {
        error!("❌ 会话失败 (阶段: {:?}): {}", self.state, err);
        self.state = SessionState::Failed;
        err
    }
}

/// 给内部错误加上阶段上下文；取消、断线和状态错误原样返回
fn within(step: &str, err: AutomationError, kind: fn(String) -> AutomationError) -> AutomationError {
    if err.is_infrastructure() || matches!(err, AutomationError::InvalidState { .. }) {
        return err;
    }
    kind(format!("{}: {}", step, err))
}
