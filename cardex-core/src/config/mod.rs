//! Runtime configuration shared with the background processors.
//!
//! These are validated values. Loading and parsing the TOML file is the
//! server crate's job.

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};

use std::time::Duration;
use url::Url;

/// Attempts per recipient when no limit is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Where notifications are delivered and how hard to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// `None` logs notifications instead of delivering them.
    pub webhook: Option<WebhookTarget>,
    /// Total delivery attempts per recipient, first try included.
    pub max_attempts: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: Url,
    /// HMAC key for the `Cardex-Signature` header.
    pub secret: Box<[u8]>,
}

impl std::fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("url", &self.url.as_str())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Settings for the listing expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingExpiryConfig {
    /// Active listings older than this are expired.
    pub ttl: Duration,
    pub sweep_interval: Duration,
    /// Upper bound on listings expired per sweep.
    pub batch_size: i64,
}

impl ListingExpiryConfig {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl,
            sweep_interval,
            batch_size: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_secret_is_not_logged() {
        let target = WebhookTarget {
            url: Url::parse("https://hooks.example.com/cardex").unwrap(),
            secret: b"top-secret".to_vec().into_boxed_slice(),
        };
        let rendered = format!("{target:?}");
        assert!(rendered.contains("hooks.example.com"));
        assert!(!rendered.contains("top-secret"));
    }
}
