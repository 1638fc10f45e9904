//! Local Storage Adapter
//!
//! File-backed implementation of the key-value store port.

mod file_store;

pub use file_store::FileStore;
