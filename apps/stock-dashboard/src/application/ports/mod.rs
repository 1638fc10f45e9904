//! Application Ports (Driven)
//!
//! Interfaces the dashboard services use to reach the outside world:
//! - **Market data**: quotes, history, movers and screener results
//! - **Alerts**: alert CRUD on the backend
//! - **Auth**: token login, registration and the current user
//! - **Key-value store**: persistent local preferences and snapshots

mod alerts_port;
mod api_error;
mod auth_port;
mod key_value_store_port;
mod market_data_port;

pub use alerts_port::AlertsPort;
pub use api_error::ApiError;
pub use auth_port::{AuthPort, NewUser, TokenResponse, UserProfile};
pub use key_value_store_port::{KeyValueStore, MemoryStore, StorageError};
pub use market_data_port::MarketDataPort;
