//! Metrics for administration calls and migrations
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding application.

use std::time::{Duration, Instant};

/// Record the outcome of one administration call
pub fn record_admin_call(operation: &str, error_type: Option<&str>) {
    let status = if error_type.is_some() { "error" } else { "ok" };
    metrics::counter!(
        "sift_admin_requests_total",
        "operation" => operation.to_string(),
        "status" => status,
    )
    .increment(1);

    if let Some(error_type) = error_type {
        metrics::counter!(
            "sift_admin_errors_total",
            "operation" => operation.to_string(),
            "error_type" => error_type.to_string(),
        )
        .increment(1);
    }
}

/// Record admin call latency
pub fn record_admin_duration(operation: &str, duration: Duration) {
    metrics::histogram!(
        "sift_admin_request_duration_seconds",
        "operation" => operation.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a finished migration
pub fn record_migration(intent: &str, outcome: &str, duration: Duration) {
    metrics::counter!(
        "sift_migrations_total",
        "intent" => intent.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        "sift_migration_duration_seconds",
        "intent" => intent.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Timer helper for administration calls
pub struct AdminTimer {
    operation: &'static str,
    start: Instant,
}

impl AdminTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Record duration and status from the call's result
    pub fn finish<T>(self, result: &crate::Result<T>) {
        record_admin_duration(self.operation, self.start.elapsed());
        record_admin_call(
            self.operation,
            result.as_ref().err().map(|e| e.error_type()),
        );
    }
}

/// Timer helper for whole migrations
pub struct MigrationTimer {
    intent: &'static str,
    start: Instant,
}

impl MigrationTimer {
    pub fn new(intent: &'static str) -> Self {
        Self {
            intent,
            start: Instant::now(),
        }
    }

    pub fn finish(self, outcome: &str) -> Duration {
        let elapsed = self.start.elapsed();
        record_migration(self.intent, outcome, elapsed);
        elapsed
    }
}
