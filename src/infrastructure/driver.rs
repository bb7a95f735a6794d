//! 浏览器驱动边界
//!
//! 会话只通过 [`Driver`] 获取页面和释放资源，测试中可以换成假驱动。

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::browser::{self, BrowserHandle};
use crate::config::Config;
use crate::error::{AutomationError, Result};
use crate::infrastructure::cdp_page::CdpPage;
use crate::infrastructure::locator::PortalPage;

#[async_trait]
pub trait Driver: Send {
    type Page: PortalPage + 'static;

    /// 启动浏览器并打开 `entry_url`
    async fn launch(&mut self, entry_url: &str, cancel: &CancellationToken) -> Result<Self::Page>;

    /// 关闭所有打开的页面
    async fn close_pages(&mut self) -> Result<()>;

    /// 关闭浏览器本身
    async fn shutdown(&mut self) -> Result<()>;
}

/// 启动方式
#[derive(Debug, Clone)]
pub enum LaunchMode {
    /// 启动新浏览器进程
    Launch {
        executable: Option<String>,
        headless: bool,
    },
    /// 连接已开启调试端口的浏览器
    Attach { port: u16 },
}

/// chromiumoxide 驱动
pub struct ChromeDriver {
    mode: LaunchMode,
    handle: Option<BrowserHandle>,
}

impl ChromeDriver {
    pub fn new(mode: LaunchMode) -> Self {
        Self { mode, handle: None }
    }

    pub fn from_config(config: &Config) -> Self {
        let mode = match config.browser_debug_port {
            Some(port) => LaunchMode::Attach { port },
            None => LaunchMode::Launch {
                executable: config.browser_executable.clone(),
                headless: config.headless,
            },
        };
        Self::new(mode)
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    type Page = CdpPage;

    async fn launch(&mut self, entry_url: &str, cancel: &CancellationToken) -> Result<CdpPage> {
        if self.handle.is_some() {
            return Err(AutomationError::Initialization("浏览器已经启动".to_string()));
        }

        let start = async {
            match &self.mode {
                LaunchMode::Launch { executable, headless } => {
                    browser::launch_browser(entry_url, executable.as_deref(), *headless).await
                }
                LaunchMode::Attach { port } => browser::connect_to_browser(*port, entry_url).await,
            }
        };
        let handle = tokio::select! {
            _ = cancel.cancelled() => return Err(AutomationError::Cancelled),
            handle = start => handle?,
        };

        let page = CdpPage::new(handle.page.clone(), cancel.clone());
        self.handle = Some(handle);
        Ok(page)
    }

    async fn close_pages(&mut self) -> Result<()> {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(());
        };
        let pages = match self.mode {
            LaunchMode::Attach { .. } => vec![handle.page.clone()],
            LaunchMode::Launch { .. } => handle.browser.pages().await?,
        };
        debug!("正在关闭 {} 个页面", pages.len());

        let mut first_err = None;
        for page in pages {
            if let Err(e) = page.close().await {
                first_err.get_or_insert(AutomationError::from(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn shutdown(&mut self) -> Result<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        let result = match self.mode {
            // 连接模式下浏览器由操作员管理，只断开连接
            LaunchMode::Attach { .. } => Ok(()),
            LaunchMode::Launch { .. } => {
                let closed = handle.browser.close().await;
                let _ = handle.browser.wait().await;
                closed.map(|_| ()).map_err(AutomationError::from)
            }
        };
        handle.handler.abort();
        info!("浏览器已关闭");
        result
    }
}
