//! Distributed Lock
//!
//! Reentrant locks with verifiable ownership, coordinated across instances
//! through pluggable lease backends.

pub mod distributed;
pub mod id;
pub mod lease;

pub use distributed::{DistributedLock, LockGuard, DEFAULT_ACQUIRE_TIMEOUT};
pub use id::LockId;
pub use lease::{InMemoryLeaseBackend, LeaseBackend};

use crate::config::node::ConfigNode;
use crate::config::registry::TypeRegistry;
use crate::config::resolve::instantiate;
use crate::core::Result;
use std::sync::Arc;

/// Build the lease backend described by `node`.
pub fn create_lease_backend(
    node: &ConfigNode<'_>,
    types: &TypeRegistry,
) -> Result<Arc<dyn LeaseBackend>> {
    instantiate(node, types.lease_backends()).map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::ConfigTree;
    use crate::core::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_create_lease_backend() {
        let tree = ConfigTree::new(json!({ "locks": { "type": "memory" } }));
        let node = tree.root().require_child("locks").unwrap();
        let backend = create_lease_backend(&node, &TypeRegistry::with_defaults()).unwrap();

        let lock = DistributedLock::new("jobs", "export", backend);
        assert!(lock.try_lock().unwrap().is_some());
    }

    #[test]
    fn test_unknown_lease_backend() {
        let tree = ConfigTree::new(json!({ "type": "zookeeper" }));
        let err = create_lease_backend(&tree.root(), &TypeRegistry::with_defaults())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("known=memory"));
    }
}
