//! Lease backends.
//!
//! A lease is the cross-instance half of a distributed lock: at most one
//! lock instance holds the lease for a key at a time. Expiry is bookkeeping
//! only; an expired lease is simply up for grabs.

use crate::config::node::{ConfigNode, Configurable};
use crate::core::Result;
use crate::lock::id::LockId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Coordinates lease ownership between lock instances.
pub trait LeaseBackend: Configurable + Send + Sync {
    /// Take the lease for `id` on behalf of `instance_id`.
    ///
    /// Returns `false` if another instance holds an unexpired lease.
    /// Re-acquiring a lease already held by `instance_id` refreshes it.
    fn try_acquire(&self, id: &LockId, instance_id: &str, expiry: Option<Duration>)
        -> Result<bool>;

    /// Extend a lease held by `instance_id`. Returns `false` if it no longer
    /// holds the lease.
    fn renew(&self, id: &LockId, instance_id: &str, expiry: Option<Duration>) -> Result<bool>;

    /// Give up a lease held by `instance_id`. Releasing a lease held by
    /// another instance does nothing.
    fn release(&self, id: &LockId, instance_id: &str) -> Result<()>;

    /// Instance currently holding an unexpired lease for `id`.
    fn holder(&self, id: &LockId) -> Result<Option<String>>;
}

#[derive(Clone, Debug)]
struct Lease {
    instance_id: String,
    expires_at: Option<Instant>,
}

impl Lease {
    fn new(instance_id: &str, expiry: Option<Duration>) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            expires_at: expiry.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Process-local lease table.
#[derive(Default)]
pub struct InMemoryLeaseBackend {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLeaseBackend {
    /// Type identifier used in configuration.
    pub const TYPE_ID: &'static str = "memory";

    /// Create an empty lease table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Configurable for InMemoryLeaseBackend {
    fn configure(&mut self, _node: &ConfigNode<'_>) -> Result<()> {
        Ok(())
    }
}

impl LeaseBackend for InMemoryLeaseBackend {
    fn try_acquire(
        &self,
        id: &LockId,
        instance_id: &str,
        expiry: Option<Duration>,
    ) -> Result<bool> {
        let key = id.key();
        let mut leases = self.leases.lock();
        if let Some(lease) = leases.get(&key) {
            if lease.instance_id != instance_id && !lease.is_expired() {
                return Ok(false);
            }
            if lease.instance_id != instance_id {
                debug!(key = %key, previous = %lease.instance_id, instance = instance_id, "Taking over expired lease");
            }
        }
        leases.insert(key, Lease::new(instance_id, expiry));
        Ok(true)
    }

    fn renew(&self, id: &LockId, instance_id: &str, expiry: Option<Duration>) -> Result<bool> {
        let mut leases = self.leases.lock();
        match leases.get_mut(&id.key()) {
            Some(lease) if lease.instance_id == instance_id => {
                *lease = Lease::new(instance_id, expiry);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release(&self, id: &LockId, instance_id: &str) -> Result<()> {
        let key = id.key();
        let mut leases = self.leases.lock();
        if leases.get(&key).is_some_and(|l| l.instance_id == instance_id) {
            leases.remove(&key);
        }
        Ok(())
    }

    fn holder(&self, id: &LockId) -> Result<Option<String>> {
        Ok(self
            .leases
            .lock()
            .get(&id.key())
            .filter(|l| !l.is_expired())
            .map(|l| l.instance_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_acquire() {
        let backend = InMemoryLeaseBackend::new();
        let id = LockId::new("jobs", "sync");

        assert!(backend.try_acquire(&id, "a", None).unwrap());
        assert!(backend.try_acquire(&id, "a", None).unwrap());
        assert!(!backend.try_acquire(&id, "b", None).unwrap());
        assert_eq!(backend.holder(&id).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_release_only_by_holder() {
        let backend = InMemoryLeaseBackend::new();
        let id = LockId::new("jobs", "sync");
        backend.try_acquire(&id, "a", None).unwrap();

        backend.release(&id, "b").unwrap();
        assert_eq!(backend.holder(&id).unwrap().as_deref(), Some("a"));

        backend.release(&id, "a").unwrap();
        assert!(backend.holder(&id).unwrap().is_none());
        assert!(backend.try_acquire(&id, "b", None).unwrap());
    }

    #[test]
    fn test_expired_lease_takeover() {
        let backend = InMemoryLeaseBackend::new();
        let id = LockId::new("jobs", "sync");
        backend
            .try_acquire(&id, "a", Some(Duration::from_millis(10)))
            .unwrap();
        assert!(!backend.try_acquire(&id, "b", None).unwrap());

        std::thread::sleep(Duration::from_millis(30));
        assert!(backend.holder(&id).unwrap().is_none());
        assert!(backend.try_acquire(&id, "b", None).unwrap());
        assert!(!backend.renew(&id, "a", None).unwrap());
        assert!(backend.renew(&id, "b", None).unwrap());
    }
}
