//! Delivery log storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::delivery::DeliveryRecord;
use crate::error::WebhookResult;

/// Filter for delivery log queries.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Only records for this device.
    pub device_id: Option<String>,
    /// Only records for this wire event name.
    pub event_name: Option<String>,
    /// Only records created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of records returned.
    pub limit: usize,
    /// Number of matching records skipped (newest first).
    pub offset: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            device_id: None,
            event_name: None,
            since: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl RecordFilter {
    /// Creates a filter with default paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one device.
    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Restricts to one event name.
    pub fn event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    /// Restricts to records created at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn matches(&self, record: &DeliveryRecord) -> bool {
        if let Some(device_id) = &self.device_id {
            if record.device_id.as_deref() != Some(device_id.as_str()) {
                return false;
            }
        }
        if let Some(event_name) = &self.event_name {
            if record.event_name != *event_name {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        true
    }
}

/// Append-only record store for terminal delivery outcomes.
///
/// Records are immutable once appended; the engine exposes no update or
/// delete operation, and pruning is an external retention job.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Appends a record. Fails only on unrecoverable storage errors, which
    /// propagate as [`crate::WebhookError::Storage`].
    async fn append(&self, record: DeliveryRecord) -> WebhookResult<()>;

    /// Returns matching records, newest first.
    async fn query(&self, filter: &RecordFilter) -> WebhookResult<Vec<DeliveryRecord>>;

    /// Looks up one record by id.
    async fn get(&self, id: &str) -> WebhookResult<Option<DeliveryRecord>>;
}

/// In-memory delivery log for tests and single-process deployments.
pub struct InMemoryDeliveryLog {
    records: tokio::sync::RwLock<Vec<DeliveryRecord>>,
}

impl InMemoryDeliveryLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self {
            records: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryDeliveryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryLog for InMemoryDeliveryLog {
    async fn append(&self, record: DeliveryRecord) -> WebhookResult<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn query(&self, filter: &RecordFilter) -> WebhookResult<Vec<DeliveryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> WebhookResult<Option<DeliveryRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(event_name: &str, device_id: Option<&str>, success: bool) -> DeliveryRecord {
        DeliveryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            event_name: event_name.to_string(),
            device_id: device_id.map(String::from),
            created_at: Utc::now(),
            success,
            response_code: success.then_some(200),
            execution_time_seconds: 0.1,
            error_message: (!success).then(|| "Endpoint returned HTTP 500".to_string()),
            payload: Value::Null,
            response_body: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let log = InMemoryDeliveryLog::new();
        let r = record("qr_code", Some("d1"), true);
        let id = r.id.clone();

        log.append(r).await.unwrap();

        let found = log.get(&id).await.unwrap().unwrap();
        assert_eq!(found.event_name, "qr_code");
        assert!(log.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_newest_first() {
        let log = InMemoryDeliveryLog::new();
        log.append(record("message_sent", None, true)).await.unwrap();
        log.append(record("message_received", None, true)).await.unwrap();

        let results = log.query(&RecordFilter::new()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].event_name, "message_received");
        assert_eq!(results[1].event_name, "message_sent");
    }

    #[tokio::test]
    async fn test_query_filters() {
        let log = InMemoryDeliveryLog::new();
        log.append(record("qr_code", Some("d1"), true)).await.unwrap();
        log.append(record("qr_code", Some("d2"), false)).await.unwrap();
        log.append(record("auth_state", Some("d1"), true)).await.unwrap();

        let by_device = log
            .query(&RecordFilter::new().device("d1"))
            .await
            .unwrap();
        assert_eq!(by_device.len(), 2);

        let by_event = log
            .query(&RecordFilter::new().event("qr_code"))
            .await
            .unwrap();
        assert_eq!(by_event.len(), 2);

        let both = log
            .query(&RecordFilter::new().device("d1").event("qr_code"))
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
    }

    #[tokio::test]
    async fn test_query_paging() {
        let log = InMemoryDeliveryLog::new();
        for _ in 0..5 {
            log.append(record("qr_code", None, true)).await.unwrap();
        }

        let page = log
            .query(&RecordFilter::new().limit(2).offset(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let tail = log
            .query(&RecordFilter::new().limit(10).offset(4))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn test_query_since() {
        let log = InMemoryDeliveryLog::new();
        let mut old = record("qr_code", None, true);
        old.created_at = Utc::now() - chrono::Duration::hours(2);
        log.append(old).await.unwrap();
        log.append(record("qr_code", None, true)).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        let recent = log
            .query(&RecordFilter::new().since(cutoff))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
    }
}
