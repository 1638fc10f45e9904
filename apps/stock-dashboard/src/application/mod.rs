//! Application Layer - Use cases and port definitions.
//!
//! Services here orchestrate the domain against the outside world through
//! the port traits; infrastructure supplies the implementations.

/// Port interfaces for the backend and local storage.
pub mod ports;

/// Cached data services, session handling and preferences.
pub mod services;
