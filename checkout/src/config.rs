//! Configuration management for the checkout flow.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Checkout configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// REST API configuration
    pub api: ApiConfig,
    /// Payment popup configuration
    pub popup: PopupConfig,
    /// Log filter (`RUST_LOG`)
    pub log_level: String,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// This application's own origin (message filter, redirect targets)
    pub origin: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Payment popup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    /// Popup width in pixels
    pub width: u32,
    /// Popup height in pixels
    pub height: u32,
    /// Interval between `closed` checks in milliseconds
    pub poll_interval_ms: u64,
    /// Wait after an observed close before declaring the attempt failed, in milliseconds
    ///
    /// A result message posted right before the popup closed itself may
    /// still be in flight.
    pub close_grace_ms: u64,
    /// Delay on the fail route before `PAYMENT_FAIL` is posted, in milliseconds
    pub fail_notify_delay_ms: u64,
}

impl PopupConfig {
    /// Poll interval as a `Duration`
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Close grace period as a `Duration`
    #[must_use]
    pub const fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    /// Fail-route notification delay as a `Duration`
    #[must_use]
    pub const fn fail_notify_delay(&self) -> Duration {
        Duration::from_millis(self.fail_notify_delay_ms)
    }
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 700,
            poll_interval_ms: 500,
            close_grace_ms: 1000,
            fail_notify_delay_ms: 1000,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse().ok());
        let popup_defaults = PopupConfig::default();

        Self {
            api: ApiConfig {
                base_url: lookup("STOREFRONT_API_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8080/api".to_string()),
                origin: lookup("STOREFRONT_ORIGIN")
                    .unwrap_or_else(|| "http://localhost:3000".to_string()),
                timeout_secs: parsed("STOREFRONT_HTTP_TIMEOUT_SECS").unwrap_or(10),
            },
            popup: PopupConfig {
                width: parsed("PAYMENT_POPUP_WIDTH")
                    .map_or(popup_defaults.width, |v: u64| u32::try_from(v).unwrap_or(popup_defaults.width)),
                height: parsed("PAYMENT_POPUP_HEIGHT")
                    .map_or(popup_defaults.height, |v: u64| u32::try_from(v).unwrap_or(popup_defaults.height)),
                poll_interval_ms: parsed("PAYMENT_POPUP_POLL_MS")
                    .unwrap_or(popup_defaults.poll_interval_ms),
                close_grace_ms: parsed("PAYMENT_POPUP_CLOSE_GRACE_MS")
                    .unwrap_or(popup_defaults.close_grace_ms),
                fail_notify_delay_ms: parsed("PAYMENT_FAIL_NOTIFY_DELAY_MS")
                    .unwrap_or(popup_defaults.fail_notify_delay_ms),
            },
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// HTTP request timeout as a `Duration`
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
