//! Output module for run reports
//!
//! This module handles:
//! - Printing the end-of-run summary
//! - Judging run health from its counters
//! - Appending per-run metrics to a JSON-lines history

mod health;
mod metrics;
mod summary;

pub use health::{assess_health, HealthReport, HealthStatus};
pub use metrics::{append_metrics, MetricsRecord};
pub use summary::{format_run_summary, print_run_summary};
