//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<SessionRecord>)
//!     ↓
//! workflow::AutomationSession (状态机，一次处理一条记录)
//!     ↓
//! services (能力层：school_resolver / record_filler)
//!     ↓
//! infrastructure (基础设施：Driver / PortalPage)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层创建浏览器驱动
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **先关闭后报告**：无论成功与否都先关闭会话，再写报告

pub mod batch_processor;
pub mod report;

pub use batch_processor::{run_batch, App};
pub use report::BatchReport;
