//! Domain Layer - Core dashboard types and client-side logic.
//!
//! Pure state and rules with no I/O: the TTL response cache, the bounded
//! notification list, screener parameter assembly, canonical stock records
//! and the freshness tracker for newly appearing symbols.

/// Alert records and request bodies.
pub mod alerts;

/// Time-to-live cache keyed by request parameters.
pub mod cache;

/// Injectable time source.
pub mod clock;

/// First-seen tracking for symbols entering a result set.
pub mod freshness;

/// Bounded notification list fed by the live feed.
pub mod notifications;

/// Screener filter state and query parameter assembly.
pub mod screener;

/// Canonical stock records, response normalization and display formatting.
pub mod stock;
