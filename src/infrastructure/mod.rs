//! 基础设施层：持有浏览器与页面，只暴露能力

pub mod cdp_page;
pub mod driver;
pub mod locator;

pub use cdp_page::CdpPage;
pub use driver::{ChromeDriver, Driver, LaunchMode};
pub use locator::{Locator, PortalPage};
