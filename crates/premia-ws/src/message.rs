//! Streaming protocol messages.
//!
//! Every frame is a JSON object tagged by `type`. Clients authenticate,
//! then install one filter per channel. The server answers with
//! `INFO`/`ERROR` and pushes events for the channels a connection follows.

use std::fmt;

use alloy::primitives::Address;
use premia_core::Side;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Quotes,
    Rfq,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quotes => write!(f, "QUOTES"),
            Self::Rfq => write!(f, "RFQ"),
        }
    }
}

/// Subscription filter. `chain_id` is mandatory, the rest are wildcards
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBody {
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Address>,
}

impl FilterBody {
    /// Filter on chain only.
    pub fn chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            pool_address: None,
            side: None,
            taker: None,
            provider: None,
        }
    }
}

/// Client -> server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Auth {
        #[serde(rename = "apiKey")]
        api_key: String,
    },
    Filter {
        channel: Channel,
        body: FilterBody,
    },
    Unsubscribe {
        channel: Channel,
    },
}

/// Server -> client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    Info { message: String },
    Error { message: String },
    PostQuote { body: Value },
    FillQuote { body: Value },
    DeleteQuote { body: Value },
    Rfq { body: Value },
}

impl ServerMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Channel an event belongs to. `None` for INFO/ERROR replies.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Self::PostQuote { .. } | Self::FillQuote { .. } | Self::DeleteQuote { .. } => {
                Some(Channel::Quotes)
            }
            Self::Rfq { .. } => Some(Channel::Rfq),
            Self::Info { .. } | Self::Error { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::PostQuote { body }
            | Self::FillQuote { body }
            | Self::DeleteQuote { body }
            | Self::Rfq { body } => Some(body),
            Self::Info { .. } | Self::Error { .. } => None,
        }
    }

    /// Wire name of the message type, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Info { .. } => "INFO",
            Self::Error { .. } => "ERROR",
            Self::PostQuote { .. } => "POST_QUOTE",
            Self::FillQuote { .. } => "FILL_QUOTE",
            Self::DeleteQuote { .. } => "DELETE_QUOTE",
            Self::Rfq { .. } => "RFQ",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_auth() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"AUTH","apiKey":"secret"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Auth {
                api_key: "secret".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_with_wildcards() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"FILTER","channel":"QUOTES","body":{"chainId":42161,"side":"ask"}}"#,
        )
        .unwrap();
        let ClientMessage::Filter { channel, body } = msg else {
            panic!("expected FILTER");
        };
        assert_eq!(channel, Channel::Quotes);
        assert_eq!(body.chain_id, 42161);
        assert_eq!(body.side, Some(Side::Ask));
        assert!(body.pool_address.is_none());
        assert!(body.provider.is_none());
    }

    #[test]
    fn test_filter_requires_chain_id() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"FILTER","channel":"RFQ","body":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_unsubscribe() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"UNSUBSCRIBE","channel":"RFQ"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Unsubscribe {
                channel: Channel::Rfq
            }
        );
    }

    #[test]
    fn test_server_message_wire_names() {
        let msg = ServerMessage::PostQuote {
            body: json!({"chainId": 1}),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "POST_QUOTE");
        assert_eq!(json["body"]["chainId"], 1);
        assert_eq!(msg.kind(), "POST_QUOTE");

        let info = serde_json::to_value(ServerMessage::info("ok")).unwrap();
        assert_eq!(info, json!({"type": "INFO", "message": "ok"}));
    }

    #[test]
    fn test_event_channels() {
        let body = json!({});
        assert_eq!(
            ServerMessage::DeleteQuote { body: body.clone() }.channel(),
            Some(Channel::Quotes)
        );
        assert_eq!(ServerMessage::Rfq { body }.channel(), Some(Channel::Rfq));
        assert_eq!(ServerMessage::error("x").channel(), None);
    }
}
