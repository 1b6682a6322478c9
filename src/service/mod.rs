//! Service layer
//!
//! Task provider access and the report built from it, kept separate from
//! HTTP handlers.

pub mod report;
pub mod tasks;

pub use report::{LateTask, lateness_report};
pub use tasks::{TaskList, TaskListClient, UpstreamTask};
