//! Webhook configuration snapshot and validation.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{WebhookError, WebhookResult};

/// Allowed request timeout range, in seconds.
pub const TIMEOUT_RANGE_SECS: (u64, u64) = (5, 120);
/// Allowed retry count range.
pub const RETRY_ATTEMPTS_RANGE: (u32, u32) = (0, 10);
/// Allowed inter-attempt delay range, in milliseconds.
pub const RETRY_DELAY_RANGE_MS: (u64, u64) = (1000, 30000);

/// Webhook configuration.
///
/// Owned by the settings collaborator; the dispatcher reads an immutable
/// snapshot per delivery and never mutates it, so a configuration edit can
/// never race an in-flight retry sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Whether webhook delivery is enabled.
    pub enabled: bool,
    /// Target URL for deliveries.
    pub url: Option<String>,
    /// Shared secret for payload signing. Empty or absent disables signing.
    pub secret: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of retries after the first failed attempt.
    pub retry_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            secret: None,
            timeout_secs: 30,
            retry_attempts: 3,
            retry_delay_ms: 5000,
        }
    }
}

impl WebhookConfig {
    /// Creates a disabled configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables delivery to the given URL.
    pub fn enabled(mut self, url: impl Into<String>) -> Self {
        self.enabled = true;
        self.url = Some(url.into());
        self
    }

    /// Sets the signing secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the per-request timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the retry count.
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Sets the delay between attempts in milliseconds.
    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Parses a configuration from the settings collaborator's flat
    /// key/value form (`webhook_enabled`, `webhook_url`, ...).
    ///
    /// Missing keys fall back to defaults; present keys must parse.
    pub fn from_settings(settings: &HashMap<String, String>) -> WebhookResult<Self> {
        let mut config = Self::default();

        if let Some(v) = settings.get("webhook_enabled") {
            config.enabled = match v.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(WebhookError::InvalidConfiguration(format!(
                        "webhook_enabled must be 0 or 1, got {other:?}"
                    )));
                }
            };
        }
        if let Some(v) = settings.get("webhook_url") {
            if !v.is_empty() {
                config.url = Some(v.clone());
            }
        }
        if let Some(v) = settings.get("webhook_secret") {
            if !v.is_empty() {
                config.secret = Some(v.clone());
            }
        }
        if let Some(v) = settings.get("webhook_timeout") {
            config.timeout_secs = parse_setting("webhook_timeout", v)?;
        }
        if let Some(v) = settings.get("webhook_retry_attempts") {
            config.retry_attempts = parse_setting("webhook_retry_attempts", v)?;
        }
        if let Some(v) = settings.get("webhook_retry_delay") {
            config.retry_delay_ms = parse_setting("webhook_retry_delay", v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates ranges and, when enabled, the target URL.
    ///
    /// Runs before any network I/O so bad settings never reach the wire.
    pub fn validate(&self) -> WebhookResult<()> {
        check_range("webhook_timeout", self.timeout_secs, TIMEOUT_RANGE_SECS)?;
        check_range(
            "webhook_retry_attempts",
            self.retry_attempts,
            RETRY_ATTEMPTS_RANGE,
        )?;
        check_range("webhook_retry_delay", self.retry_delay_ms, RETRY_DELAY_RANGE_MS)?;

        if self.enabled {
            let url = self
                .url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| {
                    WebhookError::InvalidConfiguration(
                        "webhook_url is required when webhooks are enabled".to_string(),
                    )
                })?;
            parse_url(url)?;
        }

        Ok(())
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between attempts as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Parses and validates an absolute http(s) URL.
pub(crate) fn parse_url(url: &str) -> WebhookResult<reqwest::Url> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| WebhookError::InvalidConfiguration(format!("invalid webhook_url: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(WebhookError::InvalidConfiguration(format!(
            "webhook_url must be http or https, got {other:?}"
        ))),
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> WebhookResult<T> {
    value.parse().map_err(|_| {
        WebhookError::InvalidConfiguration(format!("{key} must be an integer, got {value:?}"))
    })
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    key: &str,
    value: T,
    (min, max): (T, T),
) -> WebhookResult<()> {
    if value < min || value > max {
        return Err(WebhookError::InvalidConfiguration(format!(
            "{key} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}
