//! The high-level trading client.
//!
//! [`BreezeTrader`] is an explicit context object: it owns the session store,
//! the rate limiter and the retry policy, and forwards requests through the
//! injected [`BrokerAdapter`]. Every operation runs the same guard first —
//! session must exist and be valid, then the rate limiter admits the call —
//! so no request can leave the process on a stale session or over budget.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::adapter::{BrokerAdapter, FeedRequest, OrderId};
use crate::config::{RatePolicy, TraderConfig};
use crate::error::TraderError;
use crate::feed::{spawn_feed, FeedCallback, FeedHandle};
use crate::limit::{Admission, RateLimiter, RateLimits};
use crate::params::{hard_order_defaults, resolve, Action, OrderOptions, Params};
use crate::retry::{with_retry, RetryConfig};
use crate::session::{Session, SessionStore};
use crate::translate::translate;

/// High-level brokerage client. Construct with [`BreezeTrader::builder`].
pub struct BreezeTrader {
    adapter: Arc<dyn BrokerAdapter>,
    config: TraderConfig,
    sessions: Arc<SessionStore>,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BreezeTraderBuilder {
    adapter: Option<Arc<dyn BrokerAdapter>>,
    config: TraderConfig,
    session_path: Option<std::path::PathBuf>,
}

impl BreezeTraderBuilder {
    pub fn adapter(mut self, adapter: Arc<dyn BrokerAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn config(mut self, config: TraderConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the session file location from `session.session_file`.
    pub fn session_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<BreezeTrader, TraderError> {
        let adapter = self.adapter.ok_or_else(|| {
            TraderError::Configuration("a broker adapter is required".to_string())
        })?;
        let config = self.config;
        let session_path = self
            .session_path
            .unwrap_or_else(|| config.session.session_file.clone());

        let limiter = RateLimiter::new(RateLimits {
            per_minute: config.advanced.rate_limit_per_minute,
            per_day: config.advanced.rate_limit_per_day,
        });
        let retry = RetryConfig::with_max_retries(config.advanced.max_retries);

        Ok(BreezeTrader {
            adapter,
            sessions: Arc::new(SessionStore::new(session_path)),
            limiter: Arc::new(limiter),
            retry,
            config,
        })
    }
}

impl BreezeTrader {
    pub fn builder() -> BreezeTraderBuilder {
        BreezeTraderBuilder::default()
    }

    // ─── Session lifecycle ───────────────────────────────────────────────────

    /// Persist a freshly generated session token.
    pub async fn save_session(
        &self,
        token: &str,
        issued_at: DateTime<FixedOffset>,
    ) -> Result<Session, TraderError> {
        self.sessions.save(token, issued_at).await
    }

    pub async fn is_session_valid(&self) -> bool {
        self.sessions.is_valid().await
    }

    pub async fn session_info(&self) -> Option<Session> {
        self.sessions.load().await
    }

    /// Forget the persisted session. Idempotent.
    pub async fn logout(&self) {
        self.sessions.clear().await;
        tracing::info!("logged out, session cleared");
    }

    // ─── Guard ───────────────────────────────────────────────────────────────

    /// Session and rate-limit checks every outbound call runs first.
    async fn guard(&self) -> Result<(), TraderError> {
        if self.sessions.load().await.is_none() {
            return Err(TraderError::SessionNotFound);
        }
        if !self.sessions.is_valid().await {
            return Err(TraderError::SessionExpired);
        }
        self.sessions
            .warn_if_expiring_soon(self.config.session.warn_before_expiry_minutes)
            .await;

        if self.config.advanced.rate_limit_enabled {
            match self.config.advanced.rate_limit_policy {
                RatePolicy::Wait => self.limiter.admit().await,
                RatePolicy::Reject => {
                    if let Admission::Rejected { retry_after } =
                        self.limiter.try_admit(Instant::now()).await
                    {
                        return Err(TraderError::RateLimited {
                            retry_after: Some(retry_after),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn config_order_defaults(&self) -> Params {
        let mut p = Params::new();
        p.insert(
            "exchange_code".into(),
            Value::from(self.config.trading.default_exchange.as_str()),
        );
        p.insert(
            "product".into(),
            Value::from(self.config.trading.default_product.as_str()),
        );
        p
    }

    // ─── Orders ──────────────────────────────────────────────────────────────

    /// Place an order. Options left unset fall back to configured defaults,
    /// then to the hard defaults (market order, day validity).
    pub async fn place_order(
        &self,
        stock_code: &str,
        action: Action,
        quantity: u64,
        options: OrderOptions,
    ) -> Result<OrderId, TraderError> {
        self.guard().await?;

        let mut params = resolve(
            &hard_order_defaults(),
            &self.config_order_defaults(),
            &options.to_params(),
        );
        params.insert("stock_code".into(), Value::from(stock_code));
        params.insert("action".into(), Value::from(action.as_str()));
        params.insert("quantity".into(), Value::from(quantity.to_string()));

        let params = &params;
        let order_id = with_retry(&self.retry, move || async move {
            self.adapter.submit_order(params).await.map_err(translate)
        })
        .await?;

        tracing::info!(%order_id, stock_code, %action, quantity, "order placed");
        Ok(order_id)
    }

    /// [`place_order`](Self::place_order) with the action fixed to buy.
    pub async fn buy(
        &self,
        stock_code: &str,
        quantity: u64,
        options: OrderOptions,
    ) -> Result<OrderId, TraderError> {
        self.place_order(stock_code, Action::Buy, quantity, options).await
    }

    /// [`place_order`](Self::place_order) with the action fixed to sell.
    pub async fn sell(
        &self,
        stock_code: &str,
        quantity: u64,
        options: OrderOptions,
    ) -> Result<OrderId, TraderError> {
        self.place_order(stock_code, Action::Sell, quantity, options).await
    }

    pub async fn modify_order(
        &self,
        order_id: &OrderId,
        options: OrderOptions,
    ) -> Result<Value, TraderError> {
        self.guard().await?;
        let params = resolve(
            &Params::new(),
            &self.config_order_defaults(),
            &options.to_params(),
        );
        let params = &params;
        let detail = with_retry(&self.retry, move || async move {
            self.adapter
                .modify_order(order_id, params)
                .await
                .map_err(translate)
        })
        .await?;
        tracing::info!(%order_id, "order modified");
        Ok(detail)
    }

    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Value, TraderError> {
        self.guard().await?;
        let params = self.config_order_defaults();
        let params = &params;
        let detail = with_retry(&self.retry, move || async move {
            self.adapter
                .cancel_order(order_id, params)
                .await
                .map_err(translate)
        })
        .await?;
        tracing::info!(%order_id, "order cancelled");
        Ok(detail)
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Value, TraderError> {
        self.guard().await?;
        let params = self.config_order_defaults();
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter
                .order_detail(order_id, params)
                .await
                .map_err(translate)
        })
        .await
    }

    /// List orders; `filters` accepts friendly aliases.
    pub async fn get_orders(&self, filters: Params) -> Result<Vec<Value>, TraderError> {
        self.guard().await?;
        let params = resolve(&Params::new(), &self.config_order_defaults(), &filters);
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter.order_list(params).await.map_err(translate)
        })
        .await
    }

    // ─── Portfolio and account ───────────────────────────────────────────────

    pub async fn get_portfolio(&self) -> Result<Vec<Value>, TraderError> {
        self.guard().await?;
        let params = Params::new();
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter.holdings(params).await.map_err(translate)
        })
        .await
    }

    pub async fn get_positions(&self) -> Result<Vec<Value>, TraderError> {
        self.guard().await?;
        let params = Params::new();
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter.positions(params).await.map_err(translate)
        })
        .await
    }

    pub async fn get_quote(&self, stock_code: &str) -> Result<Value, TraderError> {
        self.guard().await?;
        let mut params = self.config_order_defaults();
        // Quotes are product-agnostic.
        params.remove("product");
        params.insert("stock_code".into(), Value::from(stock_code));
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter.quote(params).await.map_err(translate)
        })
        .await
    }

    pub async fn get_funds(&self) -> Result<Value, TraderError> {
        self.guard().await?;
        let params = Params::new();
        let params = &params;
        with_retry(&self.retry, move || async move {
            self.adapter.funds(params).await.map_err(translate)
        })
        .await
    }

    // ─── Streaming ───────────────────────────────────────────────────────────

    /// Start a market-data feed for `symbols`. The listener shares this
    /// client's rate limiter, so reconnects count against the call budget.
    pub async fn subscribe_feeds(
        &self,
        symbols: Vec<String>,
        callback: FeedCallback,
    ) -> Result<FeedHandle, TraderError> {
        self.guard().await?;
        let request = FeedRequest::quotes(symbols, self.config.trading.default_exchange.clone());
        Ok(self.spawn_listener(request, callback))
    }

    /// Start an order-update feed for the logged-in account.
    pub async fn subscribe_order_updates(
        &self,
        callback: FeedCallback,
    ) -> Result<FeedHandle, TraderError> {
        self.guard().await?;
        Ok(self.spawn_listener(FeedRequest::order_updates(), callback))
    }

    fn spawn_listener(&self, request: FeedRequest, callback: FeedCallback) -> FeedHandle {
        let limiter = self
            .config
            .advanced
            .rate_limit_enabled
            .then(|| Arc::clone(&self.limiter));
        spawn_feed(
            Arc::clone(&self.adapter),
            limiter,
            self.config.websocket.clone(),
            request,
            callback,
        )
    }

    // ─── Introspection ───────────────────────────────────────────────────────

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    /// Current `(per_minute, per_day)` rate-limiter usage.
    pub async fn rate_limit_usage(&self) -> (usize, usize) {
        self.limiter.usage(Instant::now()).await
    }
}
