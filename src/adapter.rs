//! The broker adapter seam.
//!
//! The actual network/WebSocket transport to the brokerage is an external
//! collaborator; this crate only consumes its request/response contract
//! through [`BrokerAdapter`]. Payloads stay broker-shaped
//! (`serde_json::Value`) — the wire format belongs to the broker, not to us.
//! Every adapter failure is a [`RawError`], which the translation layer
//! normalizes into the crate's taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::params::Params;

// ─── Raw failures ────────────────────────────────────────────────────────────

/// A failure as surfaced by the broker adapter, before classification.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RawError {
    pub message: String,
    /// HTTP status, when the adapter has one.
    pub status: Option<u16>,
}

impl RawError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Broker-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Streaming types ─────────────────────────────────────────────────────────

/// What a live feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Market-data ticks for a set of symbols.
    Quotes,
    /// Order-update notifications for the logged-in account.
    OrderUpdates,
}

/// Request to open a live feed.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub kind: FeedKind,
    pub symbols: Vec<String>,
    pub exchange_code: String,
    pub interval: String,
}

impl FeedRequest {
    pub fn quotes(symbols: Vec<String>, exchange_code: impl Into<String>) -> Self {
        Self {
            kind: FeedKind::Quotes,
            symbols,
            exchange_code: exchange_code.into(),
            interval: "1second".to_string(),
        }
    }

    pub fn order_updates() -> Self {
        Self {
            kind: FeedKind::OrderUpdates,
            symbols: Vec::new(),
            exchange_code: String::new(),
            interval: String::new(),
        }
    }
}

/// Events delivered to feed consumers.
///
/// `Tick` and `OrderUpdate` originate from the adapter; `Connected`,
/// `Closed` and `ReconnectFailed` are synthesized by the listener.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Feed established (or re-established).
    Connected,
    Tick(Value),
    OrderUpdate(Value),
    /// The stream ended. Followed by reconnection attempts when automatic
    /// reconnection is on, otherwise the listener halts here.
    Closed { reason: String },
    /// Automatic reconnection gave up; the caller must restart explicitly.
    ReconnectFailed { message: String },
}

// ─── Capability trait ────────────────────────────────────────────────────────

/// The capability interface the brokerage transport must provide.
///
/// One method per consumed endpoint, mirroring the broker SDK surface this
/// crate forwards to. Implementations own all networking; they never see the
/// session file, the rate limiter, or the alias table.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn submit_order(&self, params: &Params) -> Result<OrderId, RawError>;

    async fn modify_order(&self, order_id: &OrderId, params: &Params) -> Result<Value, RawError>;

    async fn cancel_order(&self, order_id: &OrderId, params: &Params) -> Result<Value, RawError>;

    async fn order_detail(&self, order_id: &OrderId, params: &Params) -> Result<Value, RawError>;

    async fn order_list(&self, params: &Params) -> Result<Vec<Value>, RawError>;

    async fn holdings(&self, params: &Params) -> Result<Vec<Value>, RawError>;

    async fn positions(&self, params: &Params) -> Result<Vec<Value>, RawError>;

    async fn quote(&self, params: &Params) -> Result<Value, RawError>;

    async fn funds(&self, params: &Params) -> Result<Value, RawError>;

    /// Open a live feed. The returned channel yields events until the
    /// connection drops; reconnection is the listener's job, not the
    /// adapter's.
    async fn open_feed(&self, request: &FeedRequest) -> Result<mpsc::Receiver<FeedEvent>, RawError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_error_display_is_message() {
        let err = RawError::with_status("Insufficient funds", 400);
        assert_eq!(err.to_string(), "Insufficient funds");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_feed_request_quotes_defaults() {
        let req = FeedRequest::quotes(vec!["RELIANCE".into()], "NSE");
        assert_eq!(req.kind, FeedKind::Quotes);
        assert_eq!(req.interval, "1second");
    }

    #[test]
    fn test_order_id_display() {
        assert_eq!(OrderId::new("ORD-1").to_string(), "ORD-1");
    }
}
