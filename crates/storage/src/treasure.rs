//! The Treasure: a typed value cell plus its metadata, guard token, and
//! transient dirty/tombstone flags.
//!
//! Mutation follows a fixed protocol: `start_guard` → typed setters (each
//! checked against the returned token) → `save` (commits metadata, marks
//! dirty) → the [`hydraide_concurrency::Guard`] releases on drop.
//!
//! The value and metadata cells use interior mutability rather than
//! `&mut self`: [`start_guard`](Treasure::start_guard) hands back a
//! [`Guard`] borrowing this Treasure for its whole lifetime, so a mutator
//! taking `&mut self` while that guard is still alive would never borrow-
//! check. The guard token, not Rust's exclusivity rules, is what actually
//! enforces single-writer access here.

use chrono::{DateTime, Utc};
use hydraide_concurrency::{Guard, GuardCell, GuardToken};
use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::value::Value;
use std::cell::{Cell, RefCell};

/// Optional bookkeeping fields carried alongside a Treasure's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Set on the first successful `save`; stable across unload/hydrate.
    pub created_at: Option<DateTime<Utc>>,
    /// Identity of the actor that created this Treasure, if known.
    pub created_by: Option<String>,
    /// Set on every successful `save`; monotonic non-decreasing.
    pub updated_at: Option<DateTime<Utc>>,
    /// Identity of the actor that last saved this Treasure, if known.
    pub updated_by: Option<String>,
    /// TTL deadline; `None` means the Treasure never expires.
    pub expire_at: Option<DateTime<Utc>>,
}

/// The atomic record stored in a Swamp.
#[derive(Debug)]
pub struct Treasure {
    key: String,
    value: RefCell<Value>,
    metadata: RefCell<Metadata>,
    guard: GuardCell,
    dirty: Cell<bool>,
    tombstone: Cell<bool>,
}

impl Treasure {
    /// A fresh, valueless Treasure under `key`. Rejects an empty key.
    pub fn new(key: impl Into<String>) -> HydraideResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(HydraideError::invalid_argument("treasure key must not be empty"));
        }
        Ok(Self {
            key,
            value: RefCell::new(Value::Void),
            metadata: RefCell::new(Metadata::default()),
            guard: GuardCell::new(),
            dirty: Cell::new(false),
            tombstone: Cell::new(false),
        })
    }

    /// This Treasure's key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The currently declared value.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    /// The current metadata snapshot.
    pub fn metadata(&self) -> Metadata {
        self.metadata.borrow().clone()
    }

    /// Has this Treasure been created, modified, or deleted since it was
    /// last flushed?
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Has this Treasure been deleted (pending physical removal at the
    /// next flush)?
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone.get()
    }

    /// Reserve this Treasure for mutation; blocks until any prior guard on
    /// it is released.
    pub fn start_guard(&self, exclusive: bool) -> Guard<'_> {
        self.guard.start_guard(exclusive)
    }

    /// Replace the declared value. Requires the outstanding guard's token.
    pub fn set_value(&self, token: GuardToken, value: Value) -> HydraideResult<()> {
        self.check_guard(token)?;
        *self.value.borrow_mut() = value;
        Ok(())
    }

    /// Set the TTL deadline, or clear it with `None`. Requires the
    /// outstanding guard's token.
    pub fn set_expire_at(&self, token: GuardToken, expire_at: Option<DateTime<Utc>>) -> HydraideResult<()> {
        self.check_guard(token)?;
        self.metadata.borrow_mut().expire_at = expire_at;
        Ok(())
    }

    /// Override `created_at` directly (used when hydrating from disk, to
    /// reproduce the original timestamp rather than stamping "now").
    /// Requires the outstanding guard's token.
    pub fn set_created_at(&self, token: GuardToken, created_at: DateTime<Utc>, by: Option<String>) -> HydraideResult<()> {
        self.check_guard(token)?;
        let mut metadata = self.metadata.borrow_mut();
        metadata.created_at = Some(created_at);
        metadata.created_by = by;
        Ok(())
    }

    /// Commit the pending mutation: stamps `created_at` on first save,
    /// always stamps `updated_at`, and marks this Treasure dirty. Requires
    /// the outstanding guard's token.
    pub fn save(&self, token: GuardToken, by: Option<String>, now: DateTime<Utc>) -> HydraideResult<()> {
        self.check_guard(token)?;
        let mut metadata = self.metadata.borrow_mut();
        if metadata.created_at.is_none() {
            metadata.created_at = Some(now);
            metadata.created_by = by.clone();
        }
        metadata.updated_at = Some(now);
        metadata.updated_by = by;
        drop(metadata);
        self.dirty.set(true);
        self.tombstone.set(false);
        Ok(())
    }

    /// Mark this Treasure for physical removal at the next flush. Requires
    /// the outstanding guard's token.
    pub fn tombstone(&self, token: GuardToken, now: DateTime<Utc>) -> HydraideResult<()> {
        self.check_guard(token)?;
        self.tombstone.set(true);
        self.dirty.set(true);
        self.metadata.borrow_mut().updated_at = Some(now);
        Ok(())
    }

    /// Clear the dirty flag after a successful flush.
    pub fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    fn check_guard(&self, token: GuardToken) -> HydraideResult<()> {
        self.guard
            .check(token)
            .map_err(|_| HydraideError::invalid_argument("guard token does not match outstanding guard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_empty_key() {
        assert!(Treasure::new("").is_err());
    }

    #[test]
    fn first_save_stamps_created_and_updated_at() {
        let mut t = Treasure::new("k1").unwrap();
        let guard = t.start_guard(true);
        let token = guard.token();
        t.set_value(token, Value::String("v1".into())).unwrap();
        t.save(token, Some("alice".into()), now()).unwrap();
        guard.release().unwrap();

        assert_eq!(t.value(), Value::String("v1".into()));
        assert_eq!(t.metadata().created_at, Some(now()));
        assert_eq!(t.metadata().updated_at, Some(now()));
        assert!(t.is_dirty());
    }

    #[test]
    fn created_at_is_stable_across_saves() {
        let mut t = Treasure::new("k1").unwrap();
        let g1 = t.start_guard(true);
        let tok1 = g1.token();
        t.set_value(tok1, Value::I64(1)).unwrap();
        t.save(tok1, None, now()).unwrap();
        g1.release().unwrap();
        let first_created = t.metadata().created_at;

        let later = now() + chrono::Duration::seconds(5);
        let g2 = t.start_guard(true);
        let tok2 = g2.token();
        t.set_value(tok2, Value::I64(2)).unwrap();
        t.save(tok2, None, later).unwrap();
        g2.release().unwrap();

        assert_eq!(t.metadata().created_at, first_created);
        assert_eq!(t.metadata().updated_at, Some(later));
    }

    #[test]
    fn mutator_rejects_mismatched_token() {
        let mut t = Treasure::new("k1").unwrap();
        let guard = t.start_guard(true);
        let _token = guard.token();
        let other = Treasure::new("k2").unwrap().start_guard(true).token();
        assert!(t.set_value(other, Value::Bool(true)).is_err());
    }

    #[test]
    fn tombstone_marks_dirty_and_tombstoned() {
        let mut t = Treasure::new("k1").unwrap();
        let guard = t.start_guard(true);
        let token = guard.token();
        t.tombstone(token, now()).unwrap();
        guard.release().unwrap();
        assert!(t.is_tombstoned());
        assert!(t.is_dirty());
    }

    #[test]
    fn clear_dirty_resets_flag() {
        let mut t = Treasure::new("k1").unwrap();
        let guard = t.start_guard(true);
        let token = guard.token();
        t.save(token, None, now()).unwrap();
        guard.release().unwrap();
        assert!(t.is_dirty());
        t.clear_dirty();
        assert!(!t.is_dirty());
    }
}
