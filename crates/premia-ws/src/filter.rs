//! Matching events against subscription filters.

use alloy::primitives::Address;
use premia_core::Side;
use serde_json::Value;

use crate::message::FilterBody;

/// Filterable fields pulled out of an event body.
///
/// Quote bodies carry `isBuy`; RFQ bodies carry `side`. Both forms are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventAttributes {
    pub chain_id: Option<u64>,
    pub pool_address: Option<Address>,
    pub side: Option<Side>,
    pub taker: Option<Address>,
    pub provider: Option<Address>,
}

impl EventAttributes {
    pub fn from_body(body: &Value) -> Self {
        let side = match body.get("side").and_then(Value::as_str) {
            Some(s) if s.eq_ignore_ascii_case("bid") => Some(Side::Bid),
            Some(s) if s.eq_ignore_ascii_case("ask") => Some(Side::Ask),
            _ => body
                .get("isBuy")
                .and_then(Value::as_bool)
                .map(Side::from_is_buy),
        };

        Self {
            chain_id: body.get("chainId").and_then(parse_u64),
            pool_address: address_field(body, "poolAddress"),
            side,
            taker: address_field(body, "taker"),
            provider: address_field(body, "provider"),
        }
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn address_field(body: &Value, key: &str) -> Option<Address> {
    body.get(key)?.as_str()?.parse().ok()
}

fn wildcard<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.as_ref() == Some(w),
    }
}

impl FilterBody {
    /// Chain must match; every other field set on the filter must match too.
    pub fn matches(&self, event: &EventAttributes) -> bool {
        event.chain_id == Some(self.chain_id)
            && wildcard(&self.pool_address, &event.pool_address)
            && wildcard(&self.side, &event.side)
            && wildcard(&self.taker, &event.taker)
            && wildcard(&self.provider, &event.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use serde_json::json;

    const POOL: Address = address!("00000000000000000000000000000000000000aa");
    const MAKER: Address = address!("00000000000000000000000000000000000000bb");

    fn quote_body() -> Value {
        json!({
            "chainId": "42161",
            "poolAddress": POOL.to_string(),
            "provider": MAKER.to_string(),
            "taker": Address::ZERO.to_string(),
            "isBuy": true,
            "size": "1000000000000000000",
        })
    }

    #[test]
    fn test_attributes_from_quote_body() {
        let attrs = EventAttributes::from_body(&quote_body());
        assert_eq!(attrs.chain_id, Some(42161));
        assert_eq!(attrs.pool_address, Some(POOL));
        assert_eq!(attrs.side, Some(Side::Bid));
        assert_eq!(attrs.provider, Some(MAKER));
        assert_eq!(attrs.taker, Some(Address::ZERO));
    }

    #[test]
    fn test_attributes_from_rfq_body() {
        let attrs = EventAttributes::from_body(&json!({"chainId": 42161, "side": "ask"}));
        assert_eq!(attrs.chain_id, Some(42161));
        assert_eq!(attrs.side, Some(Side::Ask));
        assert!(attrs.pool_address.is_none());
    }

    #[test]
    fn test_chain_only_filter_is_wildcard() {
        let attrs = EventAttributes::from_body(&quote_body());
        assert!(FilterBody::chain(42161).matches(&attrs));
        assert!(!FilterBody::chain(1).matches(&attrs));
    }

    #[test]
    fn test_optional_fields_must_match_when_set() {
        let attrs = EventAttributes::from_body(&quote_body());

        let mut filter = FilterBody::chain(42161);
        filter.pool_address = Some(POOL);
        filter.side = Some(Side::Bid);
        assert!(filter.matches(&attrs));

        filter.side = Some(Side::Ask);
        assert!(!filter.matches(&attrs));

        let mut filter = FilterBody::chain(42161);
        filter.provider = Some(POOL);
        assert!(!filter.matches(&attrs));
    }

    #[test]
    fn test_missing_event_field_fails_set_filter() {
        let attrs = EventAttributes::from_body(&json!({"chainId": 42161}));
        let mut filter = FilterBody::chain(42161);
        filter.taker = Some(MAKER);
        assert!(!filter.matches(&attrs));
    }
}
