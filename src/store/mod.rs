//! Data-store layer.
//!
//! Trait-based storage contract with runtime backend selection:
//! - Descriptors parsed from configuration
//! - Shared, name-keyed connections
//! - Per-context store instances built by the manager

pub mod backend;
pub mod backends;
pub mod connection;
pub mod descriptor;
pub mod document;
pub mod manager;

pub use backend::{DataStore, DataStoreExt, StoreCore};
pub use connection::{Connection, ConnectionManager};
pub use descriptor::{ConnectionSpec, DataStoreConfig, DEFAULT_MAX_RESULTS};
pub use document::{Document, SearchQuery};
pub use manager::DataStoreManager;
