//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// REST adapter for the dashboard backend.
pub mod api;

/// Configuration loading.
pub mod config;

/// Live notification feed over WebSocket.
pub mod feed;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// File-backed key-value storage.
pub mod storage;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
