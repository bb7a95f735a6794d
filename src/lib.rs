//! # Rehberlik Transfer
//!
//! 把辅导会谈记录自动录入 e-Rehberlik 门户的 Rust 应用程序。
//! 门户没有 API，只能驱动浏览器按固定页面流程操作。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Browser / Page），只暴露能力
//! - `Locator` / `PortalPage` - 元素定位、等待、填写的能力接口
//! - `ChromeDriver` - 唯一的浏览器 owner
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个学校选择或单条记录
//! - `SchoolResolver` - 分层匹配机构
//! - `RecordFiller` - 检索 → 填写 → 保存 → 重置
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - `AutomationSession` 状态机：初始化 → 登录 → 选校 → 录入
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 加载记录、管理会话生命周期、输出报告

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AutomationError, BatchError, ConfigError, RecordError, Result};
pub use infrastructure::{ChromeDriver, Driver, Locator, PortalPage};
pub use models::{InstitutionIdentity, RecordResult, SchoolOption, SessionRecord};
pub use orchestrator::{run_batch, App, BatchReport};
pub use workflow::{AutomationSession, SessionSettings, SessionState};
