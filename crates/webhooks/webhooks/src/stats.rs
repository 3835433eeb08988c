//! Aggregate delivery statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryRecord;

/// Window of records to aggregate over.
#[derive(Debug, Clone, Default)]
pub struct StatsWindow {
    /// Only records created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// At most this many records, newest first.
    pub limit: Option<usize>,
}

impl StatsWindow {
    /// The unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the window to records at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Restricts the window to the newest `limit` records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Aggregate delivery health, computed on demand from the delivery log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Deliveries that ultimately succeeded.
    pub successful: usize,
    /// Deliveries that exhausted their retries.
    pub failed: usize,
    /// Reserved for a future asynchronous queue; always 0 in the
    /// synchronous engine.
    pub pending: usize,
    /// Mean execution time over successful deliveries, 0 when there are none.
    pub average_execution_seconds: f64,
    /// Most recent successful delivery.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Most recent failed delivery.
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Summarizes a window of delivery records.
///
/// Pure function of its input; an empty window yields all-zero counts and
/// absent timestamps.
pub fn summarize(records: &[DeliveryRecord]) -> Statistics {
    let mut stats = Statistics::default();
    let mut success_time_total = 0.0;

    for record in records {
        if record.success {
            stats.successful += 1;
            success_time_total += record.execution_time_seconds;
            if stats.last_success_at.is_none_or(|t| record.created_at > t) {
                stats.last_success_at = Some(record.created_at);
            }
        } else {
            stats.failed += 1;
            if stats.last_failure_at.is_none_or(|t| record.created_at > t) {
                stats.last_failure_at = Some(record.created_at);
            }
        }
    }

    if stats.successful > 0 {
        stats.average_execution_seconds = success_time_total / stats.successful as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(success: bool, execution_time_seconds: f64, age_secs: i64) -> DeliveryRecord {
        DeliveryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            event_name: "message_received".to_string(),
            device_id: None,
            created_at: Utc::now() - chrono::Duration::seconds(age_secs),
            success,
            response_code: success.then_some(200),
            execution_time_seconds,
            error_message: (!success).then(|| "Endpoint returned HTTP 500".to_string()),
            payload: Value::Null,
            response_body: None,
        }
    }

    #[test]
    fn test_counts_and_average() {
        let records = vec![
            record(true, 0.1, 50),
            record(true, 0.2, 40),
            record(true, 0.3, 30),
            record(false, 1.5, 20),
            record(false, 2.5, 10),
        ];

        let stats = summarize(&records);
        assert_eq!(stats.successful, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.pending, 0);
        assert!((stats.average_execution_seconds - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window() {
        let stats = summarize(&[]);
        assert_eq!(stats.successful, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.average_execution_seconds, 0.0);
        assert!(stats.last_success_at.is_none());
        assert!(stats.last_failure_at.is_none());
    }

    #[test]
    fn test_last_timestamps() {
        let newest_success = record(true, 0.1, 10);
        let newest_failure = record(false, 0.1, 5);
        let records = vec![
            record(true, 0.1, 100),
            newest_success.clone(),
            record(false, 0.1, 50),
            newest_failure.clone(),
        ];

        let stats = summarize(&records);
        assert_eq!(stats.last_success_at, Some(newest_success.created_at));
        assert_eq!(stats.last_failure_at, Some(newest_failure.created_at));
    }

    #[test]
    fn test_average_ignores_failures() {
        let records = vec![record(false, 100.0, 10)];
        let stats = summarize(&records);
        assert_eq!(stats.average_execution_seconds, 0.0);
    }
}
