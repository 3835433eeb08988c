//! Webhook service - main entry point.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use msgbridge_events::Event;

use crate::config::WebhookConfig;
use crate::delivery::{DeliveryOutcome, DeliveryRecord, Dispatcher, TestOutcome};
use crate::error::WebhookResult;
use crate::log::{DeliveryLog, RecordFilter};
use crate::stats::{self, Statistics, StatsWindow};

/// Timeout applied to ad-hoc test deliveries, which carry no stored
/// configuration.
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The engine's facade: delivery with durable logging, ad-hoc tests, and
/// the query interface the admin UI collaborator reads.
pub struct WebhookService {
    dispatcher: Dispatcher,
    log: Arc<dyn DeliveryLog>,
}

impl WebhookService {
    /// Creates a service around the given delivery log.
    pub fn new(log: Arc<dyn DeliveryLog>) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            log,
        }
    }

    /// Replaces the dispatcher, e.g. to attach a shutdown signal.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Delivers an event and durably records the terminal outcome.
    ///
    /// Exactly one record is appended per call - never zero, never more.
    /// The append is awaited before returning, so statistics and audit
    /// views can never miss an outcome the caller believes completed; a
    /// failed append propagates as [`crate::WebhookError::Storage`] since
    /// losing the audit trail is worse than failing loudly.
    pub async fn deliver(
        &self,
        config: &WebhookConfig,
        event: &Event,
    ) -> WebhookResult<DeliveryOutcome> {
        let outcome = self.dispatcher.dispatch(config, event).await?;
        self.log.append(DeliveryRecord::new(event, &outcome)).await?;
        Ok(outcome)
    }

    /// Sends a one-off test payload to `url`, bypassing stored
    /// configuration. One attempt, no retries, nothing persisted; callers
    /// that want an audit trail deliver a `webhook_test` event through
    /// [`WebhookService::deliver`] instead.
    pub async fn test_webhook(&self, url: &str, secret: Option<&str>) -> TestOutcome {
        self.test_webhook_with(url, secret, serde_json::json!({"ping": true}))
            .await
    }

    /// [`WebhookService::test_webhook`] with a caller-supplied sample payload.
    pub async fn test_webhook_with(
        &self,
        url: &str,
        secret: Option<&str>,
        sample: Value,
    ) -> TestOutcome {
        self.dispatcher
            .test_delivery(url, secret, sample, TEST_TIMEOUT)
            .await
    }

    /// Aggregate delivery health over a window of the log.
    pub async fn statistics(&self, window: &StatsWindow) -> WebhookResult<Statistics> {
        let mut filter = RecordFilter::new().limit(window.limit.unwrap_or(usize::MAX));
        filter.since = window.since;

        let records = self.log.query(&filter).await?;
        Ok(stats::summarize(&records))
    }

    /// The newest `limit` delivery records.
    pub async fn recent_records(&self, limit: usize) -> WebhookResult<Vec<DeliveryRecord>> {
        self.log.query(&RecordFilter::new().limit(limit)).await
    }

    /// Full detail for one record, including raw payload and response.
    pub async fn record_detail(&self, id: &str) -> WebhookResult<Option<DeliveryRecord>> {
        self.log.get(id).await
    }

    /// The underlying delivery log.
    pub fn log(&self) -> &Arc<dyn DeliveryLog> {
        &self.log
    }
}
