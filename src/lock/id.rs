//! Lock identity.

use serde::{Deserialize, Serialize};

/// Logical identity of a lock: a name scoped by a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId {
    /// Namespace
    pub namespace: String,
    /// Name within the namespace
    pub name: String,
}

impl LockId {
    /// Create a new lock identity.
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Logical key, rendered as `namespace::name`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.namespace, self.name)
    }
}
