//! Audit logger implementations.

pub mod store;

pub use store::DataStoreAuditLogger;
