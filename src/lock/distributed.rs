//! Reentrant lock with verifiable ownership.
//!
//! A [`DistributedLock`] pairs a process-local reentrant mutex with a lease
//! taken from a [`LeaseBackend`] on first hold. Ownership is recorded twice:
//! the hold bookkeeping tracks which context currently holds the mutex, and
//! the owner token is the context that constructed the lock. The lock only
//! counts as held by the caller when both agree.

use crate::core::{ContextId, Error, Result};
use crate::lock::id::LockId;
use crate::lock::lease::LeaseBackend;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default bound on how long [`DistributedLock::lock`] waits.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const LEASE_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Default)]
struct HoldState {
    holder: Option<ContextId>,
    count: usize,
    acquired_at: Option<Instant>,
}

/// Reentrant mutual-exclusion handle for a named resource.
pub struct DistributedLock {
    id: LockId,
    instance_id: String,
    owner: ContextId,
    acquire_timeout: Duration,
    expiry_timeout: Option<Duration>,
    backend: Arc<dyn LeaseBackend>,
    mutex: ReentrantMutex<()>,
    state: Mutex<HoldState>,
}

impl DistributedLock {
    /// Create a lock for `namespace::name`, owned by the calling context.
    pub fn new(namespace: &str, name: &str, backend: Arc<dyn LeaseBackend>) -> Self {
        Self::from_id(LockId::new(namespace, name), backend)
    }

    /// Create a lock from a pre-built identity, owned by the calling context.
    pub fn from_id(id: LockId, backend: Arc<dyn LeaseBackend>) -> Self {
        Self {
            id,
            instance_id: uuid::Uuid::new_v4().to_string(),
            owner: ContextId::current(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            expiry_timeout: None,
            backend,
            mutex: ReentrantMutex::new(()),
            state: Mutex::new(HoldState::default()),
        }
    }

    /// Set the acquire timeout in milliseconds. Non-positive values are ignored.
    pub fn with_acquire_timeout(mut self, timeout_ms: i64) -> Self {
        if timeout_ms > 0 {
            self.acquire_timeout = Duration::from_millis(timeout_ms as u64);
        }
        self
    }

    /// Set the lease expiry in milliseconds. Non-positive values are ignored.
    pub fn with_expiry_timeout(mut self, timeout_ms: i64) -> Self {
        if timeout_ms > 0 {
            self.expiry_timeout = Some(Duration::from_millis(timeout_ms as u64));
        }
        self
    }

    /// Lock identity.
    pub fn id(&self) -> &LockId {
        &self.id
    }

    /// Logical key, `namespace::name`.
    pub fn key(&self) -> String {
        self.id.key()
    }

    /// Random identifier of this lock object.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Context that constructed the lock.
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn expiry_timeout(&self) -> Option<Duration> {
        self.expiry_timeout
    }

    /// Acquire the lock, waiting up to the acquire timeout.
    pub fn lock(&self) -> Result<LockGuard<'_>> {
        let deadline = Instant::now() + self.acquire_timeout;
        let guard = self
            .mutex
            .try_lock_until(deadline)
            .ok_or_else(|| self.timeout_error())?;

        let first = self.state.lock().count == 0;
        if first {
            while !self
                .backend
                .try_acquire(&self.id, &self.instance_id, self.expiry_timeout)?
            {
                let now = Instant::now();
                if now >= deadline {
                    return Err(self.timeout_error());
                }
                std::thread::sleep(LEASE_POLL_INTERVAL.min(deadline - now));
            }
        }
        Ok(self.enter(guard))
    }

    /// Acquire the lock without waiting. Returns `None` if the mutex or the
    /// lease is held elsewhere.
    pub fn try_lock(&self) -> Result<Option<LockGuard<'_>>> {
        let Some(guard) = self.mutex.try_lock() else {
            return Ok(None);
        };
        let first = self.state.lock().count == 0;
        if first
            && !self
                .backend
                .try_acquire(&self.id, &self.instance_id, self.expiry_timeout)?
        {
            return Ok(None);
        }
        Ok(Some(self.enter(guard)))
    }

    fn enter<'a>(&'a self, guard: ReentrantMutexGuard<'a, ()>) -> LockGuard<'a> {
        let mut state = self.state.lock();
        state.holder = Some(ContextId::current());
        state.count += 1;
        if state.count == 1 {
            state.acquired_at = Some(Instant::now());
            debug!(key = %self.id, instance = %self.instance_id, "Lock acquired");
        }
        LockGuard {
            lock: self,
            _guard: guard,
            released: false,
        }
    }

    fn release_hold(&self) -> Result<()> {
        let last = {
            let mut state = self.state.lock();
            state.count = state.count.saturating_sub(1);
            if state.count == 0 {
                state.holder = None;
                state.acquired_at = None;
            }
            state.count == 0
        };
        if last {
            self.backend.release(&self.id, &self.instance_id)?;
            debug!(key = %self.id, instance = %self.instance_id, "Lock released");
        }
        Ok(())
    }

    fn timeout_error(&self) -> Error {
        Error::LockTimeout {
            key: self.key(),
            timeout_ms: self.acquire_timeout.as_millis() as u64,
        }
    }

    /// Whether any context holds the local mutex.
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Number of holds by the calling context.
    pub fn hold_count(&self) -> usize {
        let state = self.state.lock();
        if state.holder == Some(ContextId::current()) {
            state.count
        } else {
            0
        }
    }

    /// True only if the calling context holds the mutex and is also the
    /// recorded owner.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.hold_count() > 0 && self.owner.is_current()
    }

    /// Fail unless the calling context owns this lock.
    pub fn check_owner(&self) -> Result<()> {
        let current = ContextId::current();
        if current != self.owner {
            return Err(Error::LockOwnership {
                key: self.key(),
                owner: self.owner.as_u64(),
                current: current.as_u64(),
            });
        }
        Ok(())
    }

    /// Whether the current hold has outlived the expiry timeout.
    pub fn is_expired(&self) -> bool {
        match (self.expiry_timeout, self.state.lock().acquired_at) {
            (Some(expiry), Some(at)) => at.elapsed() >= expiry,
            _ => false,
        }
    }
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("id", &self.id)
            .field("instance_id", &self.instance_id)
            .field("owner", &self.owner)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("expiry_timeout", &self.expiry_timeout)
            .finish()
    }
}

/// One hold on a [`DistributedLock`]. The hold is released on drop.
pub struct LockGuard<'a> {
    lock: &'a DistributedLock,
    _guard: ReentrantMutexGuard<'a, ()>,
    released: bool,
}

impl LockGuard<'_> {
    /// Extend the lease. Returns `false` if the lease was lost.
    pub fn renew(&self) -> Result<bool> {
        self.lock.check_owner()?;
        let lock = self.lock;
        let renewed = lock
            .backend
            .renew(&lock.id, &lock.instance_id, lock.expiry_timeout)?;
        if renewed {
            lock.state.lock().acquired_at = Some(Instant::now());
        }
        Ok(renewed)
    }

    /// Release this hold, surfacing lease errors.
    ///
    /// Fails with an ownership error outside the owning context; the hold
    /// is still released when the guard drops.
    pub fn unlock(mut self) -> Result<()> {
        self.lock.check_owner()?;
        self.released = true;
        self.lock.release_hold()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.lock.release_hold() {
            warn!(key = %self.lock.id, error = %e, "Failed to release lease");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::lock::lease::InMemoryLeaseBackend;

    fn backend() -> Arc<dyn LeaseBackend> {
        Arc::new(InMemoryLeaseBackend::new())
    }

    #[test]
    fn test_identity_and_defaults() {
        let lock = DistributedLock::new("jobs", "export", backend());
        assert_eq!(lock.key(), "jobs::export");
        assert_eq!(lock.acquire_timeout(), DEFAULT_ACQUIRE_TIMEOUT);
        assert!(lock.expiry_timeout().is_none());
        assert!(lock.owner().is_current());

        let other = DistributedLock::from_id(LockId::new("jobs", "export"), backend());
        assert_eq!(other.key(), lock.key());
        assert_ne!(other.instance_id(), lock.instance_id());
    }

    #[test]
    fn test_non_positive_timeouts_ignored() {
        let lock = DistributedLock::new("jobs", "export", backend())
            .with_acquire_timeout(0)
            .with_acquire_timeout(-5)
            .with_expiry_timeout(0)
            .with_expiry_timeout(-1);
        assert_eq!(lock.acquire_timeout(), DEFAULT_ACQUIRE_TIMEOUT);
        assert!(lock.expiry_timeout().is_none());

        let lock = lock.with_acquire_timeout(500).with_expiry_timeout(2000);
        assert_eq!(lock.acquire_timeout(), Duration::from_millis(500));
        assert_eq!(lock.expiry_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_reentrant_hold() {
        let leases = backend();
        let lock = DistributedLock::new("jobs", "export", leases.clone());

        let outer = lock.lock().unwrap();
        let inner = lock.lock().unwrap();
        assert_eq!(lock.hold_count(), 2);
        assert!(lock.is_held_by_current_thread());

        drop(inner);
        assert_eq!(lock.hold_count(), 1);
        assert_eq!(
            leases.holder(lock.id()).unwrap().as_deref(),
            Some(lock.instance_id())
        );

        outer.unlock().unwrap();
        assert_eq!(lock.hold_count(), 0);
        assert!(!lock.is_locked());
        assert!(leases.holder(lock.id()).unwrap().is_none());
    }

    #[test]
    fn test_not_held_when_queried_from_other_thread() {
        let lock = DistributedLock::new("jobs", "export", backend());
        let _guard = lock.lock().unwrap();
        assert!(lock.is_held_by_current_thread());

        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(lock.is_locked());
                assert!(!lock.is_held_by_current_thread());
                assert!(lock.check_owner().is_err());
            });
        });
    }

    #[test]
    fn test_acquired_outside_owner_context() {
        let lock = DistributedLock::new("jobs", "export", backend());

        std::thread::scope(|s| {
            s.spawn(|| {
                let guard = lock.lock().unwrap();
                assert!(lock.is_locked());
                assert_eq!(lock.hold_count(), 1);
                assert!(!lock.is_held_by_current_thread());

                assert!(guard.renew().is_err());
                let err = guard.unlock().unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Lock);
                assert!(err
                    .to_string()
                    .contains(&format!("owner={}", lock.owner())));
            });
        });
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_timeout_when_lease_held_elsewhere() {
        let leases = backend();
        let holder = DistributedLock::new("jobs", "export", leases.clone());
        let waiter = DistributedLock::new("jobs", "export", leases).with_acquire_timeout(50);

        let guard = holder.lock().unwrap();
        match waiter.lock() {
            Err(Error::LockTimeout { key, timeout_ms }) => {
                assert_eq!(key, "jobs::export");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
        assert!(waiter.try_lock().unwrap().is_none());
        assert!(!waiter.is_locked());

        drop(guard);
        assert!(waiter.try_lock().unwrap().is_some());
    }

    #[test]
    fn test_local_contention_times_out() {
        let lock = DistributedLock::new("jobs", "export", backend()).with_acquire_timeout(30);
        let _guard = lock.lock().unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                let err = lock.lock().err().unwrap();
                assert_eq!(err.kind(), ErrorKind::Lock);
                assert!(lock.try_lock().unwrap().is_none());
            });
        });
    }

    #[test]
    fn test_expired_lease_is_taken_over() {
        let leases = backend();
        let first = DistributedLock::new("jobs", "export", leases.clone()).with_expiry_timeout(20);
        let second = DistributedLock::new("jobs", "export", leases);

        let guard = first.lock().unwrap();
        assert!(!first.is_expired());
        std::thread::sleep(Duration::from_millis(40));
        assert!(first.is_expired());

        let taken = second.try_lock().unwrap();
        assert!(taken.is_some());
        assert!(!guard.renew().unwrap());
    }
}
