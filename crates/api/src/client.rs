//! The `Client`: a thin facade exposing HydrAIDE's semantic operations as a
//! single embedded entry point, independent of any wire protocol.
//!
//! Every method here desugars to exactly one [`hydraide_engine`] call — the
//! facade adds name parsing, pattern registration bookkeeping, and default
//! timeouts/capacities, nothing else. A future gRPC service would sit in
//! front of this type without changing it.

use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::name::Name;
use hydraide_core::outcome::CreateOutcome;
use hydraide_core::value::Value;
use hydraide_durability::settings::SwampSetting;
use hydraide_engine::{ConditionOp, EngineConfig, Supervisor, SwampInfo, TreasureEvent};
use hydraide_storage::beacon::{BeaconKind, Order};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// Default time a call will wait for a Swamp to finish hydrating or for a
/// concurrent close to complete, before giving up with `Timeout`.
pub const DEFAULT_SUMMON_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bounded-channel capacity for a new event subscription.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 256;

/// The embedded HydrAIDE entry point. Cheap to clone (an `Arc` wrapper
/// internally); every method is safe to call from multiple threads.
pub struct Client {
    supervisor: Arc<Supervisor>,
}

impl Client {
    /// Start a fresh engine from `config` and wrap it in a `Client`.
    pub fn start(config: EngineConfig) -> HydraideResult<Self> {
        Ok(Self {
            supervisor: Supervisor::start(config)?,
        })
    }

    /// Wrap an already-running [`Supervisor`] (e.g. one shared with other
    /// embedders in the same process).
    pub fn from_supervisor(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }

    /// The underlying supervisor, for callers that need lower-level access.
    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Liveness check: true as long as the supervisor's safe-shutdown
    /// coordinator has not begun draining. Cheap; safe to call frequently.
    pub fn heartbeat(&self) -> bool {
        !self.supervisor.safe_ops().system_locked()
    }

    /// Register a `SwampSetting` for every Swamp matching `pattern`
    /// (sanctuary/realm/swamp levels, any of which may be
    /// [`hydraide_core::name::WILDCARD`]).
    pub fn register_pattern(&self, pattern: Name, setting: SwampSetting) {
        self.supervisor.settings().register(pattern, setting);
    }

    /// Remove a previously registered pattern. Swamps it used to match fall
    /// back to the next most specific registered pattern.
    pub fn deregister_pattern(&self, pattern: &Name) {
        self.supervisor.settings().deregister(pattern);
    }

    /// Take out a business-domain lock on `key` for `ttl`. Returns an opaque
    /// lock id that must be presented to [`Client::unlock`].
    pub fn lock(&self, key: &str, ttl: Duration) -> HydraideResult<String> {
        self.supervisor.business_locks().lock(key, ttl)
    }

    /// Release a lock taken out by [`Client::lock`].
    pub fn unlock(&self, key: &str, lock_id: &str) -> HydraideResult<()> {
        self.supervisor.business_locks().unlock(key, lock_id)
    }

    /// True if `swamp` is currently hydrated (live in the Hydra registry).
    /// Does not summon it.
    pub fn is_swamp_exist(&self, swamp: &Name) -> bool {
        self.supervisor.hydra().is_exist_swamp(swamp)
    }

    /// True if `key` names a live Treasure in `swamp`, summoning the Swamp
    /// first if needed.
    pub fn is_key_exists(&self, swamp: &Name, key: &str) -> HydraideResult<bool> {
        Ok(self.summon(swamp)?.is_key_exists(key))
    }

    /// Set each `(key, value)` pair in `swamp`. Creates missing keys when
    /// `create_if_missing` is set; leaves existing keys untouched when
    /// `overwrite` is false. Applies pairs independently — one failing key
    /// does not roll back the others already applied. The returned
    /// [`CreateOutcome`] vector is positional, one entry per input pair, so
    /// a caller can tell which keys were freshly created versus left as a
    /// no-op versus overwritten.
    pub fn set(
        &self,
        swamp: &Name,
        kvs: Vec<(String, Value)>,
        create_if_missing: bool,
        overwrite: bool,
    ) -> HydraideResult<Vec<CreateOutcome>> {
        let swamp_handle = self.summon(swamp)?;
        let mut outcomes = Vec::with_capacity(kvs.len());
        for (key, value) in kvs {
            outcomes.push(swamp_handle.set(&key, value, create_if_missing, overwrite, None)?);
        }
        Ok(outcomes)
    }

    /// Fetch the current value of each of `keys` in `swamp`, `None` for any
    /// key that is absent or tombstoned.
    pub fn get(&self, swamp: &Name, keys: &[String]) -> HydraideResult<Vec<Option<Value>>> {
        let swamp_handle = self.summon(swamp)?;
        Ok(keys.iter().map(|key| swamp_handle.get(key)).collect())
    }

    /// Paginated `(key, value)` pairs from `swamp`'s beacon over `index`.
    pub fn get_by_index(
        &self,
        swamp: &Name,
        index: BeaconKind,
        order: Order,
        from: usize,
        limit: usize,
    ) -> HydraideResult<Vec<(String, Value)>> {
        Ok(self.summon(swamp)?.get_by_beacon(index, order, from, limit))
    }

    /// Tombstone each of `keys` in `swamp`. Returns how many were actually
    /// live (and thus tombstoned).
    pub fn delete(&self, swamp: &Name, keys: &[String]) -> HydraideResult<u64> {
        let swamp_handle = self.summon(swamp)?;
        let mut deleted = 0;
        for key in keys {
            if swamp_handle.delete(key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Number of live Treasures in `swamp`.
    pub fn count(&self, swamp: &Name) -> HydraideResult<usize> {
        Ok(self.summon(swamp)?.count())
    }

    /// Set or clear the TTL deadline of an existing Treasure in `swamp`.
    pub fn set_expiry(&self, swamp: &Name, key: &str, expire_at: Option<chrono::DateTime<chrono::Utc>>) -> HydraideResult<()> {
        self.summon(swamp)?.set_expire_at(key, expire_at)
    }

    /// Permanently remove `swamp`: deletes its on-disk artifacts and closes
    /// it in the Hydra registry.
    pub fn destroy(&self, swamp: &Name) -> HydraideResult<()> {
        self.supervisor.hydra().destroy_swamp(swamp, DEFAULT_SUMMON_TIMEOUT)
    }

    /// Subscribe to per-Treasure save/delete events on `swamp`.
    pub fn subscribe_to_events(&self, swamp: &Name, client_id: impl Into<String>) -> HydraideResult<Receiver<TreasureEvent>> {
        self.supervisor.hydra().subscribe_to_swamp_events(
            client_id,
            swamp,
            DEFAULT_SUMMON_TIMEOUT,
            DEFAULT_SUBSCRIPTION_CAPACITY,
        )
    }

    /// Stop delivering per-Treasure events for `swamp` to `client_id`.
    pub fn unsubscribe_from_events(&self, swamp: &Name, client_id: &str) {
        self.supervisor.hydra().unsubscribe_from_swamp_events(swamp, client_id);
    }

    /// Subscribe to Swamp-level count events on `swamp`.
    pub fn subscribe_to_info(&self, swamp: &Name, client_id: impl Into<String>) -> HydraideResult<Receiver<SwampInfo>> {
        self.supervisor.hydra().subscribe_to_swamp_info(
            client_id,
            swamp,
            DEFAULT_SUMMON_TIMEOUT,
            DEFAULT_SUBSCRIPTION_CAPACITY,
        )
    }

    /// Stop delivering info events for `swamp` to `client_id`.
    pub fn unsubscribe_from_info(&self, swamp: &Name, client_id: &str) {
        self.supervisor.hydra().unsubscribe_from_swamp_info(swamp, client_id);
    }

    /// Pop up to `n` TTL-expired Treasures from `swamp` (`n == 0` means
    /// "all due"), oldest-deadline first.
    pub fn shift_expired(&self, swamp: &Name, n: usize) -> HydraideResult<Vec<(String, Value)>> {
        Ok(self.summon(swamp)?.shift_expired(n))
    }

    /// Typed increment with an optional relational precondition on the
    /// Treasure's current value. Missing Treasures start from the zero
    /// value of `delta`'s kind.
    pub fn increment(
        &self,
        swamp: &Name,
        key: &str,
        delta: Value,
        precondition: Option<(ConditionOp, Value)>,
    ) -> HydraideResult<Value> {
        self.summon(swamp)?.increment(key, delta, precondition, None)
    }

    /// Add `member` to a `uint32-slice` Treasure, creating it if missing.
    /// Returns the slice's size after the push.
    pub fn slice_push(&self, swamp: &Name, key: &str, member: u32) -> HydraideResult<usize> {
        self.summon(swamp)?.slice_push(key, member, None)
    }

    /// Remove `member` from a `uint32-slice` Treasure. Returns the slice's
    /// size after the removal (0 if the Treasure does not exist).
    pub fn slice_delete(&self, swamp: &Name, key: &str, member: u32) -> HydraideResult<usize> {
        self.summon(swamp)?.slice_delete(key, member, None)
    }

    /// Current size of a `uint32-slice` Treasure (0 if absent).
    pub fn slice_size(&self, swamp: &Name, key: &str) -> HydraideResult<usize> {
        self.summon(swamp)?.slice_size(key)
    }

    /// Whether `member` is present in a `uint32-slice` Treasure.
    pub fn slice_contains(&self, swamp: &Name, key: &str, member: u32) -> HydraideResult<bool> {
        self.summon(swamp)?.slice_contains(key, member)
    }

    /// Quiesce in-flight operations, close every live Swamp, and persist the
    /// settings snapshot.
    pub fn graceful_stop(&self) {
        self.supervisor.graceful_stop();
    }

    fn summon(&self, swamp: &Name) -> HydraideResult<Arc<hydraide_engine::Swamp>> {
        self.supervisor.hydra().summon_swamp(swamp, DEFAULT_SUMMON_TIMEOUT)
    }
}

/// Parse `"sanctuary/realm/swamp"` into a [`Name`], the convenience form
/// most facade callers reach for instead of [`Name::new`]'s three arguments.
pub fn parse_swamp_name(canonical: &str) -> HydraideResult<Name> {
    Name::from_canonical(canonical).map_err(|e| HydraideError::invalid_argument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn client(dir: &std::path::Path) -> Client {
        let config = EngineConfig::default()
            .with_storage_root(dir.join("swamps"))
            .with_settings_dir(dir.join("settings"));
        Client::start(config).unwrap()
    }

    fn swamp_name() -> Name {
        Name::new("acme", "chat", "sessions").unwrap()
    }

    #[test]
    fn heartbeat_is_true_while_idle() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        assert!(client.heartbeat());
    }

    #[test]
    fn set_get_delete_round_trips_through_the_facade() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let swamp = swamp_name();

        client
            .set(&swamp, vec![("k1".into(), Value::I64(1))], true, true)
            .unwrap();
        assert!(client.is_key_exists(&swamp, "k1").unwrap());
        assert_eq!(client.get(&swamp, &["k1".into()]).unwrap(), vec![Some(Value::I64(1))]);
        assert_eq!(client.count(&swamp).unwrap(), 1);

        assert_eq!(client.delete(&swamp, &["k1".into()]).unwrap(), 1);
        assert_eq!(client.get(&swamp, &["k1".into()]).unwrap(), vec![None]);
    }

    #[test]
    fn set_outcomes_are_positional_per_key() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let swamp = swamp_name();

        client.set(&swamp, vec![("k1".into(), Value::I64(1))], true, true).unwrap();

        let outcomes = client
            .set(
                &swamp,
                vec![("k1".into(), Value::I64(2)), ("k2".into(), Value::I64(3))],
                true,
                false,
            )
            .unwrap();
        assert_eq!(outcomes, vec![CreateOutcome::NoOp, CreateOutcome::Created]);
    }

    #[test]
    fn increment_and_slice_ops_are_reachable_from_the_facade() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let swamp = swamp_name();

        let total = client.increment(&swamp, "counter", Value::I64(3), None).unwrap();
        assert_eq!(total, Value::I64(3));

        assert_eq!(client.slice_push(&swamp, "refs", 7).unwrap(), 1);
        assert!(client.slice_contains(&swamp, "refs", 7).unwrap());
        assert_eq!(client.slice_delete(&swamp, "refs", 7).unwrap(), 0);
    }

    #[test]
    fn set_expiry_makes_a_treasure_reachable_by_shift_expired() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let swamp = swamp_name();

        client.set(&swamp, vec![("due".into(), Value::I64(1))], true, true).unwrap();
        client
            .set_expiry(&swamp, "due", Some(chrono::Utc::now() - chrono::Duration::minutes(1)))
            .unwrap();

        let popped = client.shift_expired(&swamp, 0).unwrap();
        assert_eq!(popped.len(), 1);
        assert_eq!(popped[0].0, "due");
    }

    #[test]
    fn business_lock_round_trips() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let id = client.lock("order:1", Duration::from_secs(1)).unwrap();
        assert!(client.lock("order:1", Duration::from_secs(1)).is_err());
        client.unlock("order:1", &id).unwrap();
    }

    #[test]
    fn destroy_removes_the_swamp_from_the_active_set() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());
        let swamp = swamp_name();
        client.set(&swamp, vec![("k".into(), Value::Bool(true))], true, true).unwrap();
        assert!(client.is_swamp_exist(&swamp));

        client.destroy(&swamp).unwrap();
        assert!(!client.is_swamp_exist(&swamp));
    }

    #[test]
    fn parse_swamp_name_rejects_malformed_input() {
        assert!(parse_swamp_name("acme/chat/sessions").is_ok());
        assert!(parse_swamp_name("acme/chat").is_err());
    }
}
