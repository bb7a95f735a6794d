//! 页面能力接口
//!
//! 门户的所有元素操作都经过这里，底层驱动可以替换，测试中可以用假页面代替浏览器。

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::SchoolOption;

/// 元素定位与等待
///
/// `expr` 以 `/` 或 `(` 开头时按 XPath 解析，否则按 CSS 选择器解析。
#[async_trait]
pub trait Locator: Send + Sync {
    /// 在 `timeout` 内找到元素并点击
    async fn click(&self, expr: &str, timeout: Duration) -> Result<()>;

    /// 在 `timeout` 内等待元素出现
    async fn wait_for(&self, expr: &str, timeout: Duration) -> Result<()>;
}

/// 门户流程需要的完整页面能力
#[async_trait]
pub trait PortalPage: Locator {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// 清空输入框后逐字输入
    async fn fill(&self, expr: &str, value: &str, timeout: Duration) -> Result<()>;

    /// 直接赋值并触发 change 事件，用于固定格式的日期/时间框
    async fn set_value(&self, expr: &str, value: &str, timeout: Duration) -> Result<()>;

    /// 等待下拉框出现该选项后选中，并触发 change 事件
    async fn select_option(&self, expr: &str, value: &str, timeout: Duration) -> Result<()>;

    /// 读取下拉框的全部 (value, label)
    async fn options(&self, expr: &str, timeout: Duration) -> Result<Vec<SchoolOption>>;

    /// 读取元素文本
    async fn text(&self, expr: &str, timeout: Duration) -> Result<String>;

    /// 立即检查元素是否存在，不等待
    async fn is_present(&self, expr: &str) -> Result<bool>;

    /// 等待一次页面导航完成
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()>;
}

/// 判断表达式是否为 XPath
pub fn is_xpath(expr: &str) -> bool {
    let t = expr.trim_start();
    t.starts_with('/') || t.starts_with('(')
}
