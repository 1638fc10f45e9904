//! Feed Codec
//!
//! Decodes live feed text frames. Every frame is a JSON object
//! `{"type": "...", "data": [...]}`; `data` holds the stock items the
//! notification is about.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::notifications::NotificationKind;

/// Envelope type for stocks newly crossing the previous day's high.
pub const CROSSING_STOCKS_TYPE: &str = "new_crossing_stocks";

/// Envelope type for breakout alerts.
pub const BREAKOUT_TYPE: &str = "crossed_above_prev_day_high";

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame is not JSON or not an envelope object.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded feed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A notification-bearing frame.
    Stocks {
        /// Which notification the items raise.
        kind: NotificationKind,
        /// Raw stock items.
        items: Vec<Value>,
    },
    /// A well-formed envelope of a type this client does not handle.
    Ignored {
        /// The envelope type.
        message_type: String,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    data: Value,
}

/// JSON codec for the live feed.
#[derive(Debug, Default, Clone)]
pub struct FeedCodec;

impl FeedCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame.
    ///
    /// A `data` field that is missing or not an array yields no items.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object with a string `type`.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let envelope: Envelope = serde_json::from_str(text.trim())?;

        let kind = match envelope.message_type.as_str() {
            CROSSING_STOCKS_TYPE => NotificationKind::CrossingStock,
            BREAKOUT_TYPE => NotificationKind::Breakout,
            _ => {
                return Ok(FeedMessage::Ignored {
                    message_type: envelope.message_type,
                });
            }
        };

        let items = match envelope.data {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        Ok(FeedMessage::Stocks { kind, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_crossing_stocks() {
        let frame = json!({
            "type": "new_crossing_stocks",
            "data": [{"symbol": "AAPL", "price": 190.1}, {"symbol": "MSFT"}]
        })
        .to_string();

        let msg = FeedCodec::new().decode(&frame).unwrap();
        match msg {
            FeedMessage::Stocks { kind, items } => {
                assert_eq!(kind, NotificationKind::CrossingStock);
                assert_eq!(items.len(), 2);
                assert_eq!(items[0]["symbol"], "AAPL");
            }
            FeedMessage::Ignored { .. } => panic!("expected stocks"),
        }
    }

    #[test]
    fn decodes_breakout() {
        let frame = r#" {"type":"crossed_above_prev_day_high","data":[{"symbol":"NVDA"}]} "#;
        let msg = FeedCodec::new().decode(frame).unwrap();
        assert!(matches!(
            msg,
            FeedMessage::Stocks { kind: NotificationKind::Breakout, ref items } if items.len() == 1
        ));
    }

    #[test]
    fn unknown_type_is_ignored() {
        let msg = FeedCodec::new()
            .decode(r#"{"type":"market_status","data":{"open":true}}"#)
            .unwrap();
        assert_eq!(
            msg,
            FeedMessage::Ignored {
                message_type: "market_status".to_string()
            }
        );
    }

    #[test]
    fn non_array_data_yields_no_items() {
        let codec = FeedCodec::new();
        for frame in [
            r#"{"type":"new_crossing_stocks"}"#,
            r#"{"type":"new_crossing_stocks","data":null}"#,
            r#"{"type":"new_crossing_stocks","data":{"symbol":"A"}}"#,
        ] {
            let msg = codec.decode(frame).unwrap();
            assert!(matches!(msg, FeedMessage::Stocks { ref items, .. } if items.is_empty()));
        }
    }

    #[test]
    fn malformed_frames_are_errors() {
        let codec = FeedCodec::new();
        assert!(codec.decode("pong").is_err());
        assert!(codec.decode("[1,2,3]").is_err());
        assert!(codec.decode(r#"{"data":[]}"#).is_err());
        assert!(codec.decode(r#"{"type":42}"#).is_err());
    }
}
