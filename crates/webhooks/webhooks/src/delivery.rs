//! Webhook dispatcher and delivery outcome types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use msgbridge_events::Event;

use crate::config::{self, WebhookConfig};
use crate::error::{WebhookError, WebhookResult};
use crate::retry::{FixedDelay, NoRetry, RetryPolicy};
use crate::signature::PayloadSigner;

/// Terminal outcome of one delivery (the full attempt sequence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Whether the final attempt received a 2xx response within the timeout.
    pub success: bool,
    /// HTTP status code of the final attempt, if a response was received.
    pub response_code: Option<u16>,
    /// Wall-clock seconds across all attempts, including retry delays.
    pub execution_time_seconds: f64,
    /// Failure reason from the final attempt.
    pub error_message: Option<String>,
    /// Response body of the final attempt, parsed as JSON when possible.
    pub response_body: Option<Value>,
    /// The transmitted body, retained for the delivery record.
    pub payload: Value,
}

/// Transient result of an ad-hoc test delivery. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Whether the endpoint answered 2xx.
    pub success: bool,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
    /// Failure reason, when unsuccessful.
    pub error: Option<String>,
}

/// Persisted terminal outcome of one delivery. Append-only; never mutated
/// after creation. Pruning is an external retention job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Unique identifier.
    pub id: String,
    /// Wire event name.
    pub event_name: String,
    /// Originating device, if any.
    pub device_id: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Whether the delivery ultimately succeeded.
    pub success: bool,
    /// HTTP status code of the final attempt.
    pub response_code: Option<u16>,
    /// Wall-clock seconds across the whole attempt sequence.
    pub execution_time_seconds: f64,
    /// Failure reason from the final attempt.
    pub error_message: Option<String>,
    /// The transmitted payload.
    pub payload: Value,
    /// Response body of the final attempt.
    pub response_body: Option<Value>,
}

impl DeliveryRecord {
    /// Creates a record from an event and its terminal outcome.
    pub fn new(event: &Event, outcome: &DeliveryOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_name: event.wire_name().to_string(),
            device_id: event.device_id.clone(),
            created_at: Utc::now(),
            success: outcome.success,
            response_code: outcome.response_code,
            execution_time_seconds: outcome.execution_time_seconds,
            error_message: outcome.error_message.clone(),
            payload: outcome.payload.clone(),
            response_body: outcome.response_body.clone(),
        }
    }
}

/// One transport attempt's classification.
struct Attempt {
    success: bool,
    response_code: Option<u16>,
    response_body: Option<Value>,
    error_message: Option<String>,
}

/// Orchestrates one event's full delivery lifecycle: build payload, sign,
/// attempt, retry per policy, finalize.
///
/// Each `dispatch` call is independent; the dispatcher holds no per-delivery
/// state, so one instance may serve any number of concurrent deliveries. The
/// inter-attempt delay suspends only the current delivery's task.
pub struct Dispatcher {
    client: reqwest::Client,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Dispatcher {
    /// Creates a new dispatcher with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            shutdown: None,
        }
    }

    /// Attaches a shutdown signal. When it turns true mid-backoff, remaining
    /// retries are abandoned and the last attempt's failure becomes the
    /// terminal outcome.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Delivers an event per the configuration snapshot.
    ///
    /// Fails fast with [`WebhookError::NotConfigured`] when disabled and
    /// [`WebhookError::InvalidConfiguration`] for a bad URL or out-of-range
    /// settings, before any network I/O. Transport and status failures are
    /// retried per the fixed-delay policy and then folded into an
    /// unsuccessful outcome - callers always get a result for ordinary
    /// delivery failure.
    pub async fn dispatch(
        &self,
        config: &WebhookConfig,
        event: &Event,
    ) -> WebhookResult<DeliveryOutcome> {
        if !config.enabled {
            return Err(WebhookError::NotConfigured);
        }
        config.validate()?;

        // validate() guarantees a present, well-formed URL when enabled.
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(WebhookError::NotConfigured)?;
        let url = config::parse_url(url)?;

        let payload = build_payload(event, Utc::now().timestamp());
        let body = payload.to_string().into_bytes();
        let signature =
            PayloadSigner::from_secret(config.secret.as_deref()).map(|s| s.sign(&body));
        let policy = FixedDelay::new(config.retry_delay(), config.retry_attempts);

        tracing::debug!(event = %event.kind, url = %url, "dispatching webhook");

        let outcome = self
            .run_attempts(url, body, payload, signature, config.timeout(), &policy)
            .await;

        if outcome.success {
            tracing::debug!(
                event = %event.kind,
                seconds = outcome.execution_time_seconds,
                "webhook delivered"
            );
        } else {
            tracing::warn!(
                event = %event.kind,
                error = outcome.error_message.as_deref().unwrap_or("unknown"),
                "webhook delivery failed after {} attempt(s)",
                policy.retry_attempts() + 1
            );
        }

        Ok(outcome)
    }

    /// Performs an ad-hoc test delivery, bypassing stored configuration and
    /// the enabled gate. Exactly one attempt, no retries, nothing persisted.
    pub async fn test_delivery(
        &self,
        url: &str,
        secret: Option<&str>,
        sample: Value,
        timeout: Duration,
    ) -> TestOutcome {
        let url = match config::parse_url(url) {
            Ok(u) => u,
            Err(e) => {
                return TestOutcome {
                    success: false,
                    response_time_ms: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let payload = serde_json::json!({
            "event": "webhook_test",
            "timestamp": Utc::now().timestamp(),
            "test_data": sample,
        });
        let body = payload.to_string().into_bytes();
        let signature = PayloadSigner::from_secret(secret).map(|s| s.sign(&body));

        let outcome = self
            .run_attempts(url, body, payload, signature, timeout, &NoRetry)
            .await;

        TestOutcome {
            success: outcome.success,
            response_time_ms: (outcome.execution_time_seconds * 1000.0) as u64,
            error: outcome.error_message,
        }
    }

    /// Runs the sequential attempt loop under a retry policy.
    async fn run_attempts(
        &self,
        url: reqwest::Url,
        body: Vec<u8>,
        payload: Value,
        signature: Option<String>,
        timeout: Duration,
        policy: &dyn RetryPolicy,
    ) -> DeliveryOutcome {
        let started = std::time::Instant::now();
        let mut shutdown = self.shutdown.clone();
        let mut attempts = 0u32;

        let last = loop {
            attempts += 1;
            let attempt = self
                .attempt(url.clone(), &body, signature.as_deref(), timeout)
                .await;

            if attempt.success {
                break attempt;
            }

            match policy.next_delay(attempts) {
                Some(delay) => {
                    tracing::debug!(
                        attempt = attempts,
                        error = attempt.error_message.as_deref().unwrap_or("unknown"),
                        "attempt failed, retrying after {:?}",
                        delay
                    );
                    if wait_or_shutdown(delay, shutdown.as_mut()).await {
                        tracing::info!("shutting down, abandoning remaining webhook retries");
                        break attempt;
                    }
                }
                None => break attempt,
            }
        };

        DeliveryOutcome {
            success: last.success,
            response_code: last.response_code,
            execution_time_seconds: started.elapsed().as_secs_f64(),
            error_message: last.error_message,
            response_body: last.response_body,
            payload,
        }
    }

    /// Issues one HTTP POST and classifies the result.
    async fn attempt(
        &self,
        url: reqwest::Url,
        body: &[u8],
        signature: Option<&str>,
        timeout: Duration,
    ) -> Attempt {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(timeout);

        if let Some(sig) = signature {
            request = request.header("X-Webhook-Signature", sig);
        }

        match request.body(body.to_vec()).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let response_body = resp.text().await.ok().map(|text| {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                });

                if (200..300).contains(&status) {
                    Attempt {
                        success: true,
                        response_code: Some(status),
                        response_body,
                        error_message: None,
                    }
                } else {
                    Attempt {
                        success: false,
                        response_code: Some(status),
                        response_body,
                        error_message: Some(WebhookError::NonSuccessStatus(status).to_string()),
                    }
                }
            }
            Err(e) => Attempt {
                success: false,
                response_code: None,
                response_body: None,
                error_message: Some(WebhookError::from(e).to_string()),
            },
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes the transport body: event-specific fields plus the wire name
/// and a server-generated epoch-seconds timestamp.
fn build_payload(event: &Event, timestamp: i64) -> Value {
    let mut fields = match event.payload_fields() {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };

    fields.insert("event".to_string(), Value::String(event.wire_name().to_string()));
    fields.insert("timestamp".to_string(), timestamp.into());
    if let Some(device_id) = &event.device_id {
        fields.insert("device_id".to_string(), Value::String(device_id.clone()));
    }

    Value::Object(fields)
}

/// Sleeps for `delay`, returning true early if the shutdown signal fires.
async fn wait_or_shutdown(
    delay: Duration,
    shutdown: Option<&mut watch::Receiver<bool>>,
) -> bool {
    let Some(rx) = shutdown else {
        tokio::time::sleep(delay).await;
        return false;
    };

    if *rx.borrow() {
        return true;
    }

    let deadline = tokio::time::Instant::now() + delay;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = rx.changed() => {
                // Sender dropped counts as shutdown in progress.
                if changed.is_err() || *rx.borrow() {
                    return true;
                }
            }
        }
    }
}
