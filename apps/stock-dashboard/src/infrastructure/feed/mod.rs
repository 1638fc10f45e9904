//! Live Feed Adapter
//!
//! WebSocket client for the backend's notification push channel:
//!
//! - **Codec**: `{type, data}` envelope decoding
//! - **Keep-alive**: periodic `"ping"` text frames while open
//! - **Reconnect**: exponential backoff with an attempt cap

pub mod codec;
pub mod keepalive;
pub mod listener;
pub mod reconnect;

pub use codec::{BREAKOUT_TYPE, CROSSING_STOCKS_TYPE, CodecError, FeedCodec, FeedMessage};
pub use keepalive::{KEEPALIVE_MESSAGE, KeepAliveConfig, KeepAliveEvent, KeepAliveManager};
pub use listener::{
    FeedConfig, FeedError, FeedEvent, FeedHandle, FeedListener, FeedState, feed_url_from_api,
};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
