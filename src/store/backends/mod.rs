//! Data-store backend implementations.

pub mod memory;

pub use memory::{InMemoryDataStore, MemoryConnection};
