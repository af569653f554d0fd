//! Parameter resolution — friendly aliases plus a three-layer merge.
//!
//! Every operation builds its request payload the same way: hard defaults,
//! overwritten key-wise by configured defaults, overwritten key-wise by
//! caller-supplied options, with friendly alias names resolved to canonical
//! ones before merging. The result is a [`Params`] map whose contents depend
//! only on layer precedence, never on insertion order.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use rust_decimal::Decimal;
use serde_json::Value;

/// Canonical request payload: broker parameter name → value.
///
/// A `BTreeMap` so iteration (and therefore resolution) is deterministic.
pub type Params = BTreeMap<String, Value>;

lazy_static! {
    /// Trader-friendly name → canonical broker parameter name.
    pub static ref PARAMETER_ALIASES: HashMap<&'static str, &'static str> = HashMap::from([
        // Order parameters
        ("type", "order_type"),
        ("exchange", "exchange_code"),
        ("qty", "quantity"),
        ("product_type", "product"),
        ("stop_loss", "stoploss"),
        ("sl", "stoploss"),
        ("disclosed_qty", "disclosed_quantity"),
        // Time validity
        ("valid_till", "validity"),
        // Options parameters
        ("expiry", "expiry_date"),
        ("strike", "strike_price"),
        ("option_type", "right"),
        // GTT parameters
        ("trigger", "trigger_price"),
        ("limit", "limit_price"),
    ]);
}

/// Resolve one key through the alias table. Unknown keys pass through
/// unchanged, for forward compatibility with broker parameters this crate
/// does not know about yet.
pub fn canonical_key(key: &str) -> &str {
    PARAMETER_ALIASES.get(key).copied().unwrap_or(key)
}

/// Alias-resolve every key of a parameter map.
pub fn resolve_aliases(params: &Params) -> Params {
    params
        .iter()
        .map(|(k, v)| (canonical_key(k).to_string(), v.clone()))
        .collect()
}

/// Three-layer merge: `hard_defaults` < `config_defaults` < `user_options`.
///
/// The two upper layers are alias-resolved first. The merge is key-wise and
/// wholesale — a key is either replaced or inherited, never deep-merged.
/// Pure and infallible; value validation is the broker's job.
pub fn resolve(hard_defaults: &Params, config_defaults: &Params, user_options: &Params) -> Params {
    let mut out = hard_defaults.clone();
    for (k, v) in resolve_aliases(config_defaults) {
        out.insert(k, v);
    }
    for (k, v) in resolve_aliases(user_options) {
        out.insert(k, v);
    }
    out
}

/// The broker expects every order field as a string; defaults mirror that.
pub fn hard_order_defaults() -> Params {
    let mut p = Params::new();
    p.insert("order_type".into(), Value::from("market"));
    p.insert("price".into(), Value::from("0"));
    p.insert("validity".into(), Value::from("day"));
    p.insert("stoploss".into(), Value::from(""));
    p.insert("disclosed_quantity".into(), Value::from("0"));
    p.insert("expiry_date".into(), Value::from(""));
    p.insert("right".into(), Value::from(""));
    p.insert("strike_price".into(), Value::from(""));
    p.insert("user_remark".into(), Value::from(""));
    p
}

// ─── Order actions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Caller-supplied options ─────────────────────────────────────────────────

/// Explicit options for an order, replacing free-form keyword arguments.
///
/// Named fields cover the parameters this crate knows; `extra` is a typed
/// extension map for anything else, with friendly aliases accepted there too.
#[derive(Debug, Clone, Default)]
pub struct OrderOptions {
    pub exchange_code: Option<String>,
    pub product: Option<String>,
    pub order_type: Option<String>,
    pub price: Option<Decimal>,
    pub validity: Option<String>,
    pub stoploss: Option<Decimal>,
    pub disclosed_quantity: Option<u64>,
    pub expiry_date: Option<String>,
    pub right: Option<String>,
    pub strike_price: Option<Decimal>,
    pub user_remark: Option<String>,
    /// Forward-compatible extension map; keys may be friendly aliases.
    pub extra: Params,
}

impl OrderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchange(mut self, code: impl Into<String>) -> Self {
        self.exchange_code = Some(code.into());
        self
    }

    pub fn order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = Some(order_type.into());
        self
    }

    /// Set a limit price and switch the order type to `limit`.
    pub fn limit(mut self, price: Decimal) -> Self {
        self.order_type = Some("limit".into());
        self.price = Some(price);
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn validity(mut self, validity: impl Into<String>) -> Self {
        self.validity = Some(validity.into());
        self
    }

    pub fn stoploss(mut self, stoploss: Decimal) -> Self {
        self.stoploss = Some(stoploss);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into a parameter map, stringifying numeric fields the way the
    /// broker wire expects. Extension keys keep whatever name the caller
    /// used; `resolve` aliases them later.
    pub fn to_params(&self) -> Params {
        let mut p = Params::new();
        if let Some(v) = &self.exchange_code {
            p.insert("exchange_code".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.product {
            p.insert("product".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.order_type {
            p.insert("order_type".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.price {
            p.insert("price".into(), Value::from(v.to_string()));
        }
        if let Some(v) = &self.validity {
            p.insert("validity".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.stoploss {
            p.insert("stoploss".into(), Value::from(v.to_string()));
        }
        if let Some(v) = &self.disclosed_quantity {
            p.insert("disclosed_quantity".into(), Value::from(v.to_string()));
        }
        if let Some(v) = &self.expiry_date {
            p.insert("expiry_date".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.right {
            p.insert("right".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.strike_price {
            p.insert("strike_price".into(), Value::from(v.to_string()));
        }
        if let Some(v) = &self.user_remark {
            p.insert("user_remark".into(), Value::from(v.as_str()));
        }
        for (k, v) in &self.extra {
            p.insert(k.clone(), v.clone());
        }
        p
    }
}
