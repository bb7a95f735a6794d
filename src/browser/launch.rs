use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AutomationError, Result};

/// 浏览器句柄与后台事件循环
pub struct BrowserHandle {
    pub browser: Browser,
    pub page: Page,
    pub handler: JoinHandle<()>,
}

/// 启动浏览器并打开入口页面
///
/// `executable` 为空时由 chromiumoxide 自动查找 Chrome/Edge。
pub async fn launch_browser(url: &str, executable: Option<&str>, headless: bool) -> Result<BrowserHandle> {
    info!("🚀 启动浏览器 (无头模式: {})...", headless);
    debug!("目标 URL: {}, 可执行文件: {:?}", url, executable);

    let mut builder = BrowserConfig::builder();
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(path) = executable {
        builder = builder.chrome_executable(Path::new(path));
    }

    let config = builder
        .viewport(None)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            AutomationError::Initialization(format!("配置浏览器失败: {}", e))
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AutomationError::Initialization(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("打开入口页面失败: {}", e);
        AutomationError::Initialization(format!("无法打开 {}: {}", url, e))
    })?;

    info!("✅ 浏览器已导航到: {}", url);

    Ok(BrowserHandle {
        browser,
        page,
        handler,
    })
}
