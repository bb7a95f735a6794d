use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::launch::BrowserHandle;
use crate::error::{AutomationError, Result};

/// 连接到已开启调试端口的浏览器，并新开一个页面导航到入口地址
///
/// 用于操作员先手动打开浏览器的场景。
pub async fn connect_to_browser(port: u16, url: &str) -> Result<BrowserHandle> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AutomationError::Initialization(format!("无法连接到浏览器 (端口: {}): {}", port, e))
    })?;
    debug!("浏览器连接成功");

    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        AutomationError::Initialization(format!("创建页面失败: {}", e))
    })?;
    page.goto(url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", url, e);
        AutomationError::Initialization(format!("无法打开 {}: {}", url, e))
    })?;
    info!("已导航到: {}", url);

    Ok(BrowserHandle {
        browser,
        page,
        handler,
    })
}
