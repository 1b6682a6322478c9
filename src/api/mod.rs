//! API layer
//!
//! HTTP handlers for:
//! - Lateness report (JSON)
//! - Metrics (Prometheus)

pub mod metrics;
mod tasks;

pub use metrics::metrics_router;
pub use tasks::tasks_router;
