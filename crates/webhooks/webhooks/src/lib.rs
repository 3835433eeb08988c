//! # msgbridge Webhooks
//!
//! Webhook delivery engine for msgbridge providing:
//! - Signed delivery of device/session events to one configured endpoint
//! - Bounded fixed-delay retries with a per-request timeout
//! - An append-only delivery log with aggregate health statistics
//! - Ad-hoc endpoint tests for the admin settings flow
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use msgbridge_events::Event;
//! use msgbridge_webhooks::{InMemoryDeliveryLog, WebhookConfig, WebhookService};
//!
//! let service = WebhookService::new(Arc::new(InMemoryDeliveryLog::new()));
//! let config = WebhookConfig::new()
//!     .enabled("https://example.com/hook")
//!     .secret("s3cret");
//!
//! let event = Event::from_wire("qr_code", serde_json::json!({"qr": "..."}));
//! let outcome = service.deliver(&config, &event).await?;
//! ```

mod config;
mod delivery;
mod error;
mod log;
mod retry;
mod service;
mod signature;
mod stats;

#[cfg(test)]
mod testing;

pub use config::{
    RETRY_ATTEMPTS_RANGE, RETRY_DELAY_RANGE_MS, TIMEOUT_RANGE_SECS, WebhookConfig,
};
pub use delivery::{DeliveryOutcome, DeliveryRecord, Dispatcher, TestOutcome};
pub use error::{WebhookError, WebhookResult};
pub use log::{DeliveryLog, InMemoryDeliveryLog, RecordFilter};
pub use retry::{FixedDelay, NoRetry, RetryPolicy};
pub use service::WebhookService;
pub use signature::PayloadSigner;
pub use stats::{Statistics, StatsWindow, summarize};
