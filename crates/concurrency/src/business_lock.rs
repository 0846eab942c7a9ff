//! Business-domain cross-cutting locks: a caller explicitly takes out a
//! TTL-bounded lock on an arbitrary string key and must present the same
//! lock id again to release it.
//!
//! Distinct from the per-Treasure guard-token protocol in [`crate::guard`],
//! which every mutation acquires implicitly: a business lock has no
//! connection to any particular Swamp or Treasure, and is meant for
//! higher-level coordination the caller defines (e.g. "only one worker may
//! process order #42 at a time").

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hydraide_core::error::{HydraideError, HydraideResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Held {
    lock_id: u64,
    expires_at: Instant,
}

/// Table of `business key -> held lock`, lazily populated and never
/// shrunk except by explicit unlock or TTL expiry.
#[derive(Debug, Default)]
pub struct BusinessLockTable {
    locks: DashMap<String, Held>,
    next_id: AtomicU64,
}

impl BusinessLockTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take out a lock on `key` for `ttl`. Fails if `key` is already locked
    /// and that lock's TTL has not yet elapsed; an expired lock is treated
    /// as free and silently replaced.
    pub fn lock(&self, key: &str, ttl: Duration) -> HydraideResult<String> {
        let now = Instant::now();
        let lock_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().expires_at > now => {
                let _ = &mut occupied;
                Err(HydraideError::failed_precondition(format!("key '{key}' is already locked")))
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(Held { lock_id, expires_at: now + ttl });
                Ok(lock_id.to_string())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Held { lock_id, expires_at: now + ttl });
                Ok(lock_id.to_string())
            }
        }
    }

    /// Release the lock on `key` if `lock_id` matches its current holder.
    pub fn unlock(&self, key: &str, lock_id: &str) -> HydraideResult<()> {
        let lock_id: u64 = lock_id
            .parse()
            .map_err(|_| HydraideError::invalid_argument("malformed lock id"))?;
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().lock_id == lock_id => {
                occupied.remove();
                Ok(())
            }
            Entry::Occupied(_) => Err(HydraideError::failed_precondition(format!(
                "lock id does not match the current holder of '{key}'"
            ))),
            Entry::Vacant(_) => Err(HydraideError::not_found(format!("no lock held on '{key}'"))),
        }
    }

    /// Whether `key` is currently locked (its TTL has not yet elapsed).
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .map(|held| held.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_then_unlock_roundtrip() {
        let table = BusinessLockTable::new();
        let id = table.lock("order:42", Duration::from_secs(5)).unwrap();
        assert!(table.is_locked("order:42"));
        table.unlock("order:42", &id).unwrap();
        assert!(!table.is_locked("order:42"));
    }

    #[test]
    fn second_lock_is_rejected_while_held() {
        let table = BusinessLockTable::new();
        let _id = table.lock("order:42", Duration::from_secs(5)).unwrap();
        assert!(table.lock("order:42", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn unlock_with_wrong_id_is_rejected() {
        let table = BusinessLockTable::new();
        let _id = table.lock("order:42", Duration::from_secs(5)).unwrap();
        assert!(table.unlock("order:42", "999999").is_err());
        assert!(table.is_locked("order:42"));
    }

    #[test]
    fn expired_lock_can_be_reacquired() {
        let table = BusinessLockTable::new();
        let _id = table.lock("order:42", Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(!table.is_locked("order:42"));
        assert!(table.lock("order:42", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn unlock_on_unheld_key_is_not_found() {
        let table = BusinessLockTable::new();
        let err = table.unlock("never-locked", "1").unwrap_err();
        assert!(matches!(err, HydraideError::NotFound { .. }));
    }
}
