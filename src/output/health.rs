use crate::model::ScrapingStats;
use serde::Serialize;
use std::fmt;

const CRITICAL_SUCCESS_RATE: f64 = 50.0;
const DEGRADED_SUCCESS_RATE: f64 = 80.0;
const HIGH_ERROR_RATE: f64 = 10.0;
const MAX_EMPTY_PAGES: u64 = 5;

/// Overall verdict, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthReport {
    fn raise(&mut self, status: HealthStatus, issue: String) {
        self.status = self.status.max(status);
        self.issues.push(issue);
    }
}

/// Judges a run from its counters
///
/// Rate checks only apply when at least one post or error was counted.
pub fn assess_health(stats: &ScrapingStats) -> HealthReport {
    let mut report = HealthReport {
        status: HealthStatus::Healthy,
        issues: Vec::new(),
    };

    let attempts = stats.total_posts + stats.errors;
    if attempts > 0 {
        let success_rate = stats.success_rate();
        if success_rate < CRITICAL_SUCCESS_RATE {
            report.raise(
                HealthStatus::Critical,
                format!("Success rate too low: {:.1}%", success_rate),
            );
        } else if success_rate < DEGRADED_SUCCESS_RATE {
            report.raise(
                HealthStatus::Warning,
                format!("Success rate degraded: {:.1}%", success_rate),
            );
        }

        let error_rate = stats.errors as f64 / attempts as f64 * 100.0;
        if error_rate > HIGH_ERROR_RATE {
            report.raise(
                HealthStatus::Warning,
                format!("High error rate: {:.1}%", error_rate),
            );
        }
    }

    if stats.empty_pages > MAX_EMPTY_PAGES {
        report.raise(
            HealthStatus::Warning,
            format!("Many empty pages: {}", stats.empty_pages),
        );
    }

    if stats.status_count(403) > 0 || stats.status_count(429) > 0 {
        report.raise(
            HealthStatus::Critical,
            "Rate limiting or access denied detected".to_string(),
        );
    }

    match report.status {
        HealthStatus::Healthy => tracing::info!("Health check: healthy"),
        status => tracing::warn!("Health check: {} ({})", status, report.issues.join("; ")),
    }

    report
}
