//! Execution-context identity.
//!
//! Data stores and locks are bound to the context that created them. A
//! context is an OS thread; each thread receives a process-unique token the
//! first time it asks for one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: ContextId = ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed));
}

/// Token identifying an execution context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    /// Token of the calling context.
    pub fn current() -> Self {
        CURRENT.with(|id| *id)
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether the calling context is this one.
    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Call-scoped context passed through data-store operations.
#[derive(Clone, Debug, Default)]
pub struct Context {
    values: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value.
    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Builder-style [`Context::set`].
    pub fn with(mut self, key: &str, value: serde_json::Value) -> Self {
        self.set(key, value);
        self
    }
}
