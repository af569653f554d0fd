//! The closed error taxonomy every upstream failure is normalized into.
//!
//! Each variant carries a plain-language message template keyed by the
//! variant itself, independent of whatever the broker said — the upstream
//! wording may change, the messages here do not. The original raw failure is
//! preserved only by the generic [`TraderError::Api`] wrapper.

use std::time::Duration;

use thiserror::Error;

use crate::adapter::RawError;

/// Top-level error for every fallible operation in the crate.
#[derive(Error, Debug)]
pub enum TraderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Session expired — run the login flow to generate a fresh session token. \
         Tokens are valid for 24 hours or until midnight, whichever comes first."
    )]
    SessionExpired,

    #[error(
        "No active session found — run the login flow once per trading day \
         to generate a session token."
    )]
    SessionNotFound,

    #[error(
        "Authentication failed — check that the API key and secret key are \
         correct and that the session token is still valid."
    )]
    Authentication,

    #[error("Order validation error: {0}")]
    OrderValidation(String),

    #[error("Insufficient funds for this order — check your account balance.")]
    InsufficientFunds,

    #[error("Market is closed — equity and F&O trade 9:15 AM to 3:30 PM IST, Mon-Fri.")]
    MarketClosed,

    #[error("Invalid stock code: '{0}'")]
    InvalidStockCode(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("API rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Unclassified upstream failure. Keeps the original message and cause.
    #[error("API error: {message}")]
    Api {
        message: String,
        #[source]
        cause: RawError,
    },
}

/// Tag for each [`TraderError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    SessionExpired,
    SessionNotFound,
    Authentication,
    OrderValidation,
    InsufficientFunds,
    MarketClosed,
    InvalidStockCode,
    OrderNotFound,
    RateLimit,
    Network,
    WebSocket,
    Api,
}

impl TraderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::SessionNotFound => ErrorKind::SessionNotFound,
            Self::Authentication => ErrorKind::Authentication,
            Self::OrderValidation(_) => ErrorKind::OrderValidation,
            Self::InsufficientFunds => ErrorKind::InsufficientFunds,
            Self::MarketClosed => ErrorKind::MarketClosed,
            Self::InvalidStockCode(_) => ErrorKind::InvalidStockCode,
            Self::OrderNotFound(_) => ErrorKind::OrderNotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Network(_) => ErrorKind::Network,
            Self::WebSocket(_) => ErrorKind::WebSocket,
            Self::Api { .. } => ErrorKind::Api,
        }
    }

    /// Whether a caller may back off and retry this failure locally.
    ///
    /// Session errors are deliberately excluded: they require the user to
    /// re-authenticate, retrying would only loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimit | ErrorKind::Network)
    }

    /// Backoff hint, if the failure carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_is_retryable() {
        let err = TraderError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_session_errors_are_not_retryable() {
        assert!(!TraderError::SessionExpired.is_retryable());
        assert!(!TraderError::SessionNotFound.is_retryable());
    }

    #[test]
    fn test_message_is_independent_of_upstream_wording() {
        // Same template regardless of what the broker said.
        let err = TraderError::InsufficientFunds;
        assert!(err.to_string().contains("account balance"));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(
            TraderError::Configuration("missing api_key".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            TraderError::WebSocket("gave up".into()).kind(),
            ErrorKind::WebSocket
        );
    }
}
