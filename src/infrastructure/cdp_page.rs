//! chromiumoxide 页面适配 - 基础设施层
//!
//! 持有唯一的 page 资源，实现 [`Locator`] / [`PortalPage`]

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AutomationError, Result};
use crate::infrastructure::locator::{is_xpath, Locator, PortalPage};
use crate::models::SchoolOption;
use crate::utils::retry::sleep_or_cancel;

const FIRST_POLL: Duration = Duration::from_millis(100);
const MAX_POLL: Duration = Duration::from_millis(500);

/// 页面脚本的轮询返回值：`ready` 为 false 表示元素尚未就绪
#[derive(Debug, Deserialize)]
struct Probe<T> {
    ready: bool,
    value: Option<T>,
}

/// chromiumoxide 页面
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 所有等待都有超时并响应取消
/// - 不认识 SessionRecord / 学校
pub struct CdpPage {
    page: Page,
    cancel: CancellationToken,
}

impl CdpPage {
    pub fn new(page: Page, cancel: CancellationToken) -> Self {
        Self { page, cancel }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 反复执行 `body` 直到返回 `ready: true`
    ///
    /// `body` 是一段以 `el` 为目标元素的 JS，必须返回 `{ ready, value }`；
    /// 元素不存在时自动返回未就绪。
    async fn poll<T: DeserializeOwned + Send>(&self, expr: &str, timeout: Duration, body: &str) -> Result<T> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return {{ ready: false }}; {} }})()",
            element_js(expr)?,
            body
        );
        let page = self;
        let script = script.as_str();
        poll_until(expr, timeout, &self.cancel, move || page.eval_as::<Probe<T>>(script)).await
    }

    async fn find(&self, expr: &str) -> Result<Element> {
        let element = if is_xpath(expr) {
            self.page.find_xpath(expr).await?
        } else {
            self.page.find_element(expr).await?
        };
        Ok(element)
    }

    /// 等待元素可见并可交互
    async fn wait_interactable(&self, expr: &str, timeout: Duration) -> Result<()> {
        self.poll::<bool>(
            expr,
            timeout,
            "const visible = el.getClientRects().length > 0; \
             return { ready: visible && !el.disabled, value: true };",
        )
        .await
        .map(|_| ())
    }

    async fn cancellable<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AutomationError::Cancelled),
            out = fut => out,
        }
    }
}

#[async_trait]
impl Locator for CdpPage {
    async fn click(&self, expr: &str, timeout: Duration) -> Result<()> {
        self.wait_interactable(expr, timeout).await?;
        let element = self.find(expr).await?;
        element.click().await?;
        debug!("已点击: {}", expr);
        Ok(())
    }

    async fn wait_for(&self, expr: &str, timeout: Duration) -> Result<()> {
        self.poll::<bool>(expr, timeout, "return { ready: true, value: true };")
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PortalPage for CdpPage {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.cancellable(async {
            self.page.goto(url).await?;
            Ok(())
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn fill(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        self.wait_interactable(expr, timeout).await?;
        self.poll::<bool>(
            expr,
            timeout,
            "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); \
             return { ready: true, value: true };",
        )
        .await?;
        let element = self.find(expr).await?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn set_value(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        let body = format!(
            "el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return {{ ready: true, value: true }};",
            serde_json::to_string(value)?
        );
        self.poll::<bool>(expr, timeout, &body).await.map(|_| ())
    }

    async fn select_option(&self, expr: &str, value: &str, timeout: Duration) -> Result<()> {
        let body = format!(
            "const wanted = {}; \
             if (el.disabled || !Array.from(el.options || []).some(o => o.value === wanted)) return {{ ready: false }}; \
             el.value = wanted; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return {{ ready: true, value: true }};",
            serde_json::to_string(value)?
        );
        self.poll::<bool>(expr, timeout, &body).await.map(|_| ())
    }

    async fn options(&self, expr: &str, timeout: Duration) -> Result<Vec<SchoolOption>> {
        self.poll(
            expr,
            timeout,
            "const opts = Array.from(el.options || []).map(o => ({ code: o.value, label: (o.text || '').trim() })); \
             return { ready: opts.length > 0, value: opts };",
        )
        .await
    }

    async fn text(&self, expr: &str, timeout: Duration) -> Result<String> {
        self.poll(
            expr,
            timeout,
            "const t = (el.innerText || el.textContent || el.value || '').trim(); \
             return { ready: true, value: t };",
        )
        .await
    }

    async fn is_present(&self, expr: &str) -> Result<bool> {
        let script = format!("(() => !!({}))()", element_js(expr)?);
        self.eval_as(script).await
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()> {
        let nav = async {
            self.page.wait_for_navigation().await?;
            Ok(())
        };
        match tokio::time::timeout(timeout, self.cancellable(nav)).await {
            Ok(out) => out,
            Err(_) => Err(AutomationError::Driver(format!(
                "等待页面导航超时 ({}ms)",
                timeout.as_millis()
            ))),
        }
    }
}

/// 按 100ms 起步、翻倍到 500ms 的间隔调用 `probe`，直到就绪或超时
///
/// 页面回发期间脚本执行会失败（执行上下文被销毁），这类错误按未就绪处理；
/// 取消和连接断开立即返回。
async fn poll_until<T, F, Fut>(expr: &str, timeout: Duration, cancel: &CancellationToken, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let started = Instant::now();
    let mut interval = FIRST_POLL;

    loop {
        match probe().await {
            Ok(Probe {
                ready: true,
                value: Some(value),
            }) => return Ok(value),
            Ok(_) => {}
            Err(e) if e.is_infrastructure() => return Err(e),
            Err(e) => debug!("探测 {} 失败，继续等待: {}", expr, e),
        }

        if started.elapsed() >= timeout {
            debug!("元素等待超时: {} ({}ms)", expr, timeout.as_millis());
            return Err(AutomationError::ElementNotFound {
                expr: expr.to_string(),
                timeout_ms: timeout.as_millis(),
            });
        }

        sleep_or_cancel(interval, cancel).await?;
        interval = (interval * 2).min(MAX_POLL);
    }
}

/// 生成定位元素的 JS 表达式
fn element_js(expr: &str) -> Result<String> {
    let literal = serde_json::to_string(expr)?;
    Ok(if is_xpath(expr) {
        format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            literal
        )
    } else {
        format!("document.querySelector({})", literal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn element_js_escapes_and_picks_engine() {
        let css = element_js("input[name=\"q\"]").unwrap();
        assert_eq!(css, r#"document.querySelector("input[name=\"q\"]")"#);

        let xpath = element_js("//a[text()='Kaydet']").unwrap();
        assert!(xpath.starts_with("document.evaluate(\"//a[text()='Kaydet']\""));
        assert!(xpath.ends_with("singleNodeValue"));
    }

    fn probe(ready: bool) -> Result<Probe<bool>> {
        Ok(Probe {
            ready,
            value: Some(true),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn polling_survives_script_errors_during_postback() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let out = poll_until("#txtOgrenciNo", Duration::from_secs(60), &cancel, move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0..=2 => Err(AutomationError::Driver("Execution context was destroyed".into())),
                3 => probe(false),
                _ => probe(true),
            }
        })
        .await;

        assert!(out.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_runs_until_timeout_when_scripts_keep_failing() {
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let err = poll_until::<bool, _, _>("#btnAc", Duration::from_secs(5), &cancel, || async {
            Err(AutomationError::Driver("Cannot find context with specified id".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AutomationError::ElementNotFound { .. }));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_on_disconnect() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let err = poll_until::<bool, _, _>("#btnAc", Duration::from_secs(5), &cancel, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AutomationError::Disconnected("websocket closed".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AutomationError::Disconnected(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn probe_without_value_is_not_ready() {
        let probe: Probe<bool> = serde_json::from_str(r#"{"ready": false}"#).unwrap();
        assert!(!probe.ready);
        assert!(probe.value.is_none());
    }
}
