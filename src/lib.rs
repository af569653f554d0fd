//! # breeze-trader
//!
//! A safety-first wrapper around a brokerage API, layered bottom-up:
//!
//! - [`error`] / [`translate`] — closed error taxonomy and the ordered rules
//!   that classify raw broker failures into it
//! - [`params`] — friendly aliases and the three-layer parameter merge
//! - [`session`] — session-token persistence with broker expiry semantics
//! - [`limit`] — dual sliding-window client-side rate limiter
//! - [`retry`] — backoff policy for transient failures
//! - [`adapter`] — the capability trait the brokerage transport implements
//! - [`feed`] — live-feed listener with bounded reconnection
//! - [`client`] — the high-level [`BreezeTrader`](client::BreezeTrader)
//!
//! ## Quick start
//!
//! ```no_run
//! use breeze_trader::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run(adapter: Arc<dyn BrokerAdapter>) -> Result<(), TraderError> {
//! let trader = BreezeTrader::builder()
//!     .adapter(adapter)
//!     .config(TraderConfig::default())
//!     .build()?;
//!
//! let order_id = trader
//!     .buy("RELIANCE", 10, OrderOptions::new().limit("2450.50".parse().unwrap()))
//!     .await?;
//! println!("placed {order_id}");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod limit;
pub mod params;
pub mod retry;
pub mod session;
pub mod translate;

/// Convenience re-exports for the common path.
pub mod prelude {
    pub use crate::adapter::{BrokerAdapter, FeedEvent, FeedKind, FeedRequest, OrderId, RawError};
    pub use crate::client::{BreezeTrader, BreezeTraderBuilder};
    pub use crate::config::{RatePolicy, TraderConfig};
    pub use crate::error::{ErrorKind, TraderError};
    pub use crate::feed::{FeedCallback, FeedHandle};
    pub use crate::limit::{Admission, RateLimiter, RateLimits};
    pub use crate::params::{Action, OrderOptions, Params};
    pub use crate::retry::RetryConfig;
    pub use crate::session::{Session, SessionStore};
    pub use crate::translate::translate;
}
