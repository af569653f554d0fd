//! The configuration contract the client consumes.
//!
//! Producing this struct (YAML parsing, `${ENV}` substitution, validation)
//! is the job of an external config resolver; this crate only defines the
//! typed shape with sensible defaults, deserializable from whatever source
//! the application uses.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraderConfig {
    pub trading: TradingConfig,
    pub session: SessionConfig,
    pub advanced: AdvancedConfig,
    pub websocket: WebsocketConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    pub default_exchange: String,
    pub default_product: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_exchange: "NSE".to_string(),
            default_product: "cash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub warn_before_expiry_minutes: u64,
    pub session_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warn_before_expiry_minutes: 60,
            session_file: PathBuf::from(".session_token"),
        }
    }
}

/// What to do when the rate limiter is over budget.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Fail fast with a precise `retry_after` hint.
    Reject,
    /// Block until a slot frees up.
    Wait,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvancedConfig {
    pub rate_limit_enabled: bool,
    pub rate_limit_per_minute: usize,
    pub rate_limit_per_day: usize,
    pub rate_limit_policy: RatePolicy,
    pub max_retries: u32,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            rate_limit_per_minute: 90,
            rate_limit_per_day: 5000,
            rate_limit_policy: RatePolicy::Reject,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebsocketConfig {
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TraderConfig::default();
        assert_eq!(config.trading.default_exchange, "NSE");
        assert_eq!(config.trading.default_product, "cash");
        assert_eq!(config.session.warn_before_expiry_minutes, 60);
        assert!(config.advanced.rate_limit_enabled);
        assert_eq!(config.advanced.rate_limit_per_minute, 90);
        assert_eq!(config.advanced.rate_limit_per_day, 5000);
        assert_eq!(config.advanced.rate_limit_policy, RatePolicy::Reject);
        assert!(config.websocket.auto_reconnect);
        assert_eq!(config.websocket.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: TraderConfig = serde_json::from_str(
            r#"{
                "trading": { "default_exchange": "BSE" },
                "advanced": { "rate_limit_policy": "wait", "max_retries": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.trading.default_exchange, "BSE");
        // Untouched sibling keys keep their defaults.
        assert_eq!(config.trading.default_product, "cash");
        assert_eq!(config.advanced.rate_limit_policy, RatePolicy::Wait);
        assert_eq!(config.advanced.max_retries, 5);
        assert_eq!(config.websocket.reconnect_delay_ms, 5000);
    }
}
