//! Classification of raw broker failures into the closed taxonomy.
//!
//! Pattern matching on upstream messages is inherently brittle, so the rule
//! list is versioned data: rules run in order, first match wins, and the
//! regression tests below pin literal upstream samples so a wording change
//! upstream shows up as a test failure here rather than a silent
//! misclassification.

use crate::adapter::RawError;
use crate::error::TraderError;

/// One classification rule: lowercase substrings, any of which matches.
struct Rule {
    patterns: &'static [&'static str],
    build: fn(&RawError) -> TraderError,
}

/// Ordered message rules. Earlier entries win.
static RULES: &[Rule] = &[
    Rule {
        patterns: &["session", "token", "expired", "invalid session"],
        build: |_| TraderError::SessionExpired,
    },
    Rule {
        patterns: &["authentication", "unauthorized", "invalid credentials"],
        build: |_| TraderError::Authentication,
    },
    Rule {
        patterns: &["insufficient funds", "insufficient balance"],
        build: |_| TraderError::InsufficientFunds,
    },
    Rule {
        patterns: &["market closed", "market is closed"],
        build: |_| TraderError::MarketClosed,
    },
    Rule {
        patterns: &["invalid stock", "invalid symbol"],
        build: |_| TraderError::InvalidStockCode("unknown".to_string()),
    },
    Rule {
        patterns: &["order not found"],
        build: |_| TraderError::OrderNotFound("unknown".to_string()),
    },
    Rule {
        patterns: &["rate limit", "too many requests"],
        build: |_| TraderError::RateLimited { retry_after: None },
    },
    // Before the network rule: "websocket connection reset" is a WS failure,
    // not a generic network one.
    Rule {
        patterns: &["websocket"],
        build: |raw| TraderError::WebSocket(raw.message.clone()),
    },
    Rule {
        patterns: &["connection", "timeout", "network", "dns", "socket"],
        build: |raw| TraderError::Network(raw.message.clone()),
    },
];

/// Classify a raw broker failure.
///
/// Status-code rules run first, then the ordered message rules. Unmatched
/// failures are wrapped as [`TraderError::Api`] with the original message and
/// cause preserved — no information loss. Pure, no I/O, never panics.
pub fn translate(raw: RawError) -> TraderError {
    if let Some(err) = translate_status(&raw) {
        return err;
    }

    let lowered = raw.message.to_lowercase();
    for rule in RULES {
        if rule.patterns.iter().any(|p| lowered.contains(p)) {
            return (rule.build)(&raw);
        }
    }

    TraderError::Api {
        message: raw.message.clone(),
        cause: raw,
    }
}

fn translate_status(raw: &RawError) -> Option<TraderError> {
    match raw.status? {
        401 | 403 => Some(TraderError::Authentication),
        429 => Some(TraderError::RateLimited { retry_after: None }),
        408 | 502 | 503 | 504 => Some(TraderError::Network(raw.message.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind_of(message: &str) -> ErrorKind {
        translate(RawError::new(message)).kind()
    }

    // Literal upstream samples. If the broker changes its wording, these are
    // the tests that should break.
    #[test]
    fn test_upstream_message_samples() {
        assert_eq!(kind_of("Insufficient funds to place order"), ErrorKind::InsufficientFunds);
        assert_eq!(kind_of("Insufficient balance in account"), ErrorKind::InsufficientFunds);
        assert_eq!(kind_of("Session key is expired"), ErrorKind::SessionExpired);
        assert_eq!(kind_of("Invalid session token"), ErrorKind::SessionExpired);
        assert_eq!(kind_of("Authentication failed: invalid credentials"), ErrorKind::Authentication);
        assert_eq!(kind_of("Market is closed for trading"), ErrorKind::MarketClosed);
        assert_eq!(kind_of("Invalid stock code RELIANC"), ErrorKind::InvalidStockCode);
        assert_eq!(kind_of("Order not found for order id 123"), ErrorKind::OrderNotFound);
        assert_eq!(kind_of("Rate limit exceeded, slow down"), ErrorKind::RateLimit);
        assert_eq!(kind_of("Too many requests"), ErrorKind::RateLimit);
        assert_eq!(kind_of("Connection reset by peer"), ErrorKind::Network);
        assert_eq!(kind_of("Read timeout while waiting for response"), ErrorKind::Network);
    }

    #[test]
    fn test_first_match_wins_ordering() {
        // "session" outranks "timeout" because the session rule comes first.
        assert_eq!(kind_of("Session validation timeout"), ErrorKind::SessionExpired);
        // "websocket" outranks the generic connection rule.
        assert_eq!(kind_of("WebSocket connection reset"), ErrorKind::WebSocket);
    }

    #[test]
    fn test_status_codes_outrank_messages() {
        let raw = RawError::with_status("something odd happened", 429);
        assert_eq!(translate(raw).kind(), ErrorKind::RateLimit);

        let raw = RawError::with_status("nope", 401);
        assert_eq!(translate(raw).kind(), ErrorKind::Authentication);

        let raw = RawError::with_status("bad gateway", 502);
        assert_eq!(translate(raw).kind(), ErrorKind::Network);
    }

    #[test]
    fn test_unmatched_preserves_message_and_cause() {
        let raw = RawError::new("Weird new broker failure XYZ-42");
        let err = translate(raw);
        match err {
            TraderError::Api { ref message, ref cause } => {
                assert_eq!(message, "Weird new broker failure XYZ-42");
                assert_eq!(cause.message, "Weird new broker failure XYZ-42");
            }
            other => panic!("expected Api wrapper, got {other:?}"),
        }
        // The caller-facing text still carries the original message.
        assert!(err.to_string().contains("XYZ-42"));
    }

    #[test]
    fn test_network_variant_keeps_raw_message() {
        let err = translate(RawError::new("connection refused (os error 111)"));
        match err {
            TraderError::Network(msg) => assert!(msg.contains("os error 111")),
            other => panic!("expected Network, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_status_falls_through_to_messages() {
        let raw = RawError::with_status("Order not found: OX1", 400);
        assert_eq!(translate(raw).kind(), ErrorKind::OrderNotFound);
    }
}
