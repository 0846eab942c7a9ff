//! The Swamp runtime: in-memory Treasure store, guarded mutation, beacon
//! maintenance, TTL shift, event fanout, and chunked-store flush/hydrate.

use crate::events::{EventBroker, SwampInfo, TreasureEvent};
use chrono::{DateTime, Utc};
use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::name::Name;
use hydraide_core::outcome::CreateOutcome;
use hydraide_core::value::{Value, ValueKind};
use hydraide_durability::codec::{self, TreasureRecord};
use hydraide_durability::metadata;
use hydraide_durability::settings::SwampSetting;
use hydraide_storage::beacon::{Beacon, BeaconKind, Order};
use hydraide_storage::chunk_store::ChunkStore;
use hydraide_storage::compressor::Algorithm;
use hydraide_storage::treasure::Treasure;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Relational precondition for [`Swamp::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    /// Current value equals the operand.
    Eq,
    /// Current value does not equal the operand.
    Ne,
    /// Current value is less than the operand.
    Lt,
    /// Current value is less than or equal to the operand.
    Le,
    /// Current value is greater than the operand.
    Gt,
    /// Current value is greater than or equal to the operand.
    Ge,
}

struct SwampState {
    treasures: HashMap<String, Arc<Mutex<Treasure>>>,
    beacons: HashMap<BeaconKind, Beacon>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl SwampState {
    fn new() -> Self {
        let mut beacons = HashMap::new();
        for kind in [BeaconKind::Key, BeaconKind::CreatedAt, BeaconKind::UpdatedAt, BeaconKind::ExpireAt] {
            beacons.insert(kind, Beacon::new(kind));
        }
        Self {
            treasures: HashMap::new(),
            beacons,
            created_at: None,
            updated_at: None,
        }
    }

    /// Remove `key` from every beacon, then re-insert it into the fixed
    /// beacons and the value beacon matching its current declared kind
    /// (creating that beacon lazily). Called with the Treasure's own lock
    /// already held by the caller.
    fn reindex(&mut self, key: &str, treasure: &Treasure) {
        for beacon in self.beacons.values_mut() {
            beacon.remove(key);
        }
        let kind = treasure.value().kind();
        if kind != ValueKind::Void {
            self.beacons
                .entry(BeaconKind::Value(kind))
                .or_insert_with(|| Beacon::new(BeaconKind::Value(kind)))
                .upsert(key, treasure);
        }
        for fixed in [BeaconKind::Key, BeaconKind::CreatedAt, BeaconKind::UpdatedAt, BeaconKind::ExpireAt] {
            self.beacons.get_mut(&fixed).unwrap().upsert(key, treasure);
        }
    }

    fn unindex(&mut self, key: &str) {
        for beacon in self.beacons.values_mut() {
            beacon.remove(key);
        }
    }

    fn live_count(&self) -> usize {
        self.treasures.values().filter(|t| !t.lock().is_tombstoned()).count()
    }
}

/// A Swamp: a named, independently-lifecycled container of Treasures.
pub struct Swamp {
    name: Name,
    setting: SwampSetting,
    state: Mutex<SwampState>,
    vigil_count: AtomicI64,
    closing: AtomicBool,
    events: EventBroker<TreasureEvent>,
    info_events: EventBroker<SwampInfo>,
    chunk_store: Arc<ChunkStore>,
    storage_path: PathBuf,
    max_depth: u32,
}

const CHUNK_FILE_PREFIX: &str = "chunk-";

impl Swamp {
    /// A fresh, empty Swamp (no hydration performed, no on-disk chunks
    /// read).
    pub fn new_empty(
        name: Name,
        setting: SwampSetting,
        chunk_store: Arc<ChunkStore>,
        storage_path: PathBuf,
        max_depth: u32,
    ) -> Self {
        Self {
            name,
            setting,
            state: Mutex::new(SwampState::new()),
            vigil_count: AtomicI64::new(0),
            closing: AtomicBool::new(false),
            events: EventBroker::new(),
            info_events: EventBroker::new(),
            chunk_store,
            storage_path,
            max_depth,
        }
    }

    /// Load a persistent Swamp's chunk files from `storage_path`. A
    /// missing folder is treated as "create empty", not an error; a
    /// corrupt chunk surfaces a load error and no partially-populated
    /// Swamp is returned.
    pub fn hydrate(
        name: Name,
        setting: SwampSetting,
        chunk_store: Arc<ChunkStore>,
        storage_path: PathBuf,
        max_depth: u32,
    ) -> HydraideResult<Self> {
        if !chunk_store.is_folder_exists(&storage_path) {
            return Ok(Self::new_empty(name, setting, chunk_store, storage_path, max_depth));
        }

        let mut file_names: Vec<PathBuf> = std::fs::read_dir(&storage_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        file_names.sort();

        let mut state = SwampState::new();
        let mut first_file = true;
        for path in &file_names {
            let segments = chunk_store.get_file(path, Algorithm::Snappy)?;
            for (i, segment) in segments.iter().enumerate() {
                if first_file && i == 0 {
                    state.created_at = Some(metadata::decode(segment)?);
                    continue;
                }
                let record = codec::decode_segment(segment)?;
                let treasure = record_to_treasure(&record)?;
                state.reindex(&record.key, &treasure);
                state.treasures.insert(record.key.clone(), Arc::new(Mutex::new(treasure)));
            }
            first_file = false;
        }
        state.updated_at = state.created_at;

        Ok(Self {
            name,
            setting,
            state: Mutex::new(state),
            vigil_count: AtomicI64::new(0),
            closing: AtomicBool::new(false),
            events: EventBroker::new(),
            info_events: EventBroker::new(),
            chunk_store,
            storage_path,
            max_depth,
        })
    }

    /// This Swamp's name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The resolved setting this Swamp is running under.
    pub fn setting(&self) -> SwampSetting {
        self.setting
    }

    /// Number of non-tombstoned Treasures.
    pub fn count(&self) -> usize {
        self.state.lock().live_count()
    }

    /// True once `count() == 0`; used to decide self-destruction at the
    /// next flush boundary.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Open a vigil. Fails if this Swamp has begun closing.
    pub fn begin_vigil(&self) -> HydraideResult<()> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(HydraideError::failed_precondition("swamp is closing"));
        }
        self.vigil_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Close a vigil opened by [`Swamp::begin_vigil`].
    pub fn cease_vigil(&self) {
        self.vigil_count.fetch_sub(1, Ordering::SeqCst);
    }

    /// Current number of open vigils.
    pub fn vigil_count(&self) -> i64 {
        self.vigil_count.load(Ordering::SeqCst)
    }

    /// True once this Swamp has begun its terminal close transition.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Mark this Swamp as closing. No new vigils may begin afterward;
    /// mutators already holding a guard are allowed to finish.
    pub fn begin_closing(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// True if a key names a non-tombstoned Treasure.
    pub fn is_key_exists(&self, key: &str) -> bool {
        let state = self.state.lock();
        match state.treasures.get(key) {
            Some(t) => !t.lock().is_tombstoned(),
            None => false,
        }
    }

    /// The declared value of `key`, or `None` if absent or tombstoned.
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock();
        let treasure = state.treasures.get(key)?;
        let treasure = treasure.lock();
        if treasure.is_tombstoned() {
            None
        } else {
            Some(treasure.value())
        }
    }

    fn get_arc(&self, key: &str) -> Option<Arc<Mutex<Treasure>>> {
        self.state.lock().treasures.get(key).cloned()
    }

    fn get_or_create_arc(&self, key: &str) -> HydraideResult<Arc<Mutex<Treasure>>> {
        let mut state = self.state.lock();
        if let Some(existing) = state.treasures.get(key) {
            return Ok(existing.clone());
        }
        let treasure = Arc::new(Mutex::new(Treasure::new(key)?));
        state.treasures.insert(key.to_string(), treasure.clone());
        Ok(treasure)
    }

    fn reindex(&self, key: &str, treasure: &Treasure) {
        self.state.lock().reindex(key, treasure);
    }

    fn touch_updated_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        if state.created_at.is_none() {
            state.created_at = Some(now);
        }
        state.updated_at = Some(now);
    }

    fn emit_save(&self, key: &str, value: &Value) {
        self.events.publish(TreasureEvent {
            key: key.to_string(),
            value: Some(value.clone()),
            deleted: false,
        });
        self.info_events.publish(SwampInfo { count: self.count() });
    }

    /// Create (if missing and `create_if_missing`) and set a Treasure's
    /// value. With `overwrite == false`, an existing Treasure's value is
    /// left untouched and the call succeeds as a no-op; the returned
    /// [`CreateOutcome`] tells the caller which of the three happened.
    pub fn set(
        &self,
        key: &str,
        value: Value,
        create_if_missing: bool,
        overwrite: bool,
        actor: Option<String>,
    ) -> HydraideResult<CreateOutcome> {
        if key.is_empty() {
            return Err(HydraideError::invalid_argument("key must not be empty"));
        }
        let existed = self.is_key_exists(key);
        if !existed && !create_if_missing {
            return Err(HydraideError::not_found(format!("treasure not found: {key}")));
        }
        if existed && !overwrite {
            return Ok(CreateOutcome::NoOp);
        }
        let treasure_arc = self.get_or_create_arc(key)?;
        let now = Utc::now();
        {
            let mut treasure = treasure_arc.lock();
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.set_value(token, value.clone())?;
            treasure.save(token, actor, now)?;
            guard.release().ok();
        }
        self.reindex(key, &treasure_arc.lock());
        self.touch_updated_at(now);
        self.emit_save(key, &value);
        Ok(if existed { CreateOutcome::Overwritten } else { CreateOutcome::Created })
    }

    /// Create-only insert: fails with `AlreadyExists` if `key` is already
    /// present (and not tombstoned).
    pub fn create_only(&self, key: &str, value: Value, actor: Option<String>) -> HydraideResult<()> {
        if self.is_key_exists(key) {
            return Err(HydraideError::already_exists(format!("treasure already exists: {key}")));
        }
        self.set(key, value, true, true, actor).map(|_| ())
    }

    /// Set or clear the TTL deadline of an existing, live Treasure.
    /// `NotFound` if `key` is absent or tombstoned.
    pub fn set_expire_at(&self, key: &str, expire_at: Option<DateTime<Utc>>) -> HydraideResult<()> {
        let Some(treasure_arc) = self.get_arc(key) else {
            return Err(HydraideError::not_found(format!("treasure not found: {key}")));
        };
        {
            let treasure = treasure_arc.lock();
            if treasure.is_tombstoned() {
                return Err(HydraideError::not_found(format!("treasure not found: {key}")));
            }
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.set_expire_at(token, expire_at)?;
            guard.release().ok();
        }
        self.reindex(key, &treasure_arc.lock());
        Ok(())
    }

    /// Tombstone `key`. Returns `true` if a live Treasure was found and
    /// tombstoned, `false` if it was already absent. Physical removal
    /// happens at the next [`Swamp::flush`].
    pub fn delete(&self, key: &str) -> HydraideResult<bool> {
        let existing = {
            let state = self.state.lock();
            state.treasures.get(key).cloned()
        };
        let Some(treasure_arc) = existing else {
            return Ok(false);
        };
        let now = Utc::now();
        {
            let mut treasure = treasure_arc.lock();
            if treasure.is_tombstoned() {
                return Ok(false);
            }
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.tombstone(token, now)?;
            guard.release().ok();
        }
        self.state.lock().unindex(key);
        self.touch_updated_at(now);
        self.events.publish(TreasureEvent {
            key: key.to_string(),
            value: None,
            deleted: true,
        });
        self.info_events.publish(SwampInfo { count: self.count() });
        Ok(true)
    }

    /// Paginated `(key, value)` pairs from one beacon.
    pub fn get_by_beacon(&self, kind: BeaconKind, order: Order, from: usize, limit: usize) -> Vec<(String, Value)> {
        let state = self.state.lock();
        let Some(beacon) = state.beacons.get(&kind) else {
            return Vec::new();
        };
        beacon
            .query(order, from, limit)
            .into_iter()
            .filter_map(|key| {
                let treasure = state.treasures.get(&key)?.lock();
                Some((key.clone(), treasure.value()))
            })
            .collect()
    }

    /// Pop up to `n` due Treasures (`n == 0` means "all"), ascending by
    /// `expire_at`, removing them from the Swamp and its beacons.
    pub fn shift_expired(&self, n: usize) -> Vec<(String, Value)> {
        let now = Utc::now();
        let mut state = self.state.lock();

        let candidates = state
            .beacons
            .get(&BeaconKind::ExpireAt)
            .expect("expire_at beacon always present")
            .query(Order::Ascending, 0, 0);

        let mut due_keys = Vec::new();
        for key in candidates {
            let is_due = state
                .treasures
                .get(&key)
                .map(|t| t.lock().metadata().expire_at.map(|e| e <= now).unwrap_or(false))
                .unwrap_or(false);
            if !is_due {
                break;
            }
            due_keys.push(key);
            if n != 0 && due_keys.len() >= n {
                break;
            }
        }

        let mut results = Vec::with_capacity(due_keys.len());
        for key in &due_keys {
            for beacon in state.beacons.values_mut() {
                beacon.remove(key);
            }
            if let Some(arc) = state.treasures.remove(key) {
                results.push((key.clone(), arc.lock().value()));
            }
        }
        drop(state);

        for (key, _) in &results {
            self.events.publish(TreasureEvent {
                key: key.clone(),
                value: None,
                deleted: true,
            });
        }
        if !results.is_empty() {
            self.info_events.publish(SwampInfo { count: self.count() });
        }
        results
    }

    /// Typed increment with an optional relational precondition on the
    /// current value. Missing Treasures start from the zero value of
    /// `delta`'s kind.
    pub fn increment(
        &self,
        key: &str,
        delta: Value,
        precondition: Option<(ConditionOp, Value)>,
        actor: Option<String>,
    ) -> HydraideResult<Value> {
        if !delta.is_numeric() {
            return Err(HydraideError::failed_precondition("increment delta must be numeric"));
        }
        let treasure_arc = self.get_or_create_arc(key)?;
        let now = Utc::now();
        let new_value = {
            let mut treasure = treasure_arc.lock();
            let current = match treasure.value() {
                Value::Void => zero_like(&delta),
                other if other.kind() == delta.kind() => other.clone(),
                _ => return Err(HydraideError::failed_precondition("increment type mismatch")),
            };
            if let Some((op, operand)) = precondition {
                let ordering = compare_numeric(&current, &operand)
                    .ok_or_else(|| HydraideError::failed_precondition("precondition operand kind mismatch"))?;
                if !condition_holds(op, ordering) {
                    return Err(HydraideError::condition_not_met(key, current));
                }
            }
            let new_value = add_numeric(&current, &delta)?;
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.set_value(token, new_value.clone())?;
            treasure.save(token, actor, now)?;
            guard.release().ok();
            new_value
        };
        self.reindex(key, &treasure_arc.lock());
        self.touch_updated_at(now);
        self.emit_save(key, &new_value);
        Ok(new_value)
    }

    /// Add `member` to the `uint32-slice` Treasure at `key`, creating it if
    /// missing. No-op if `member` is already present. Returns the slice's
    /// size after the push.
    pub fn slice_push(&self, key: &str, member: u32, actor: Option<String>) -> HydraideResult<usize> {
        let treasure_arc = self.get_or_create_arc(key)?;
        let now = Utc::now();
        let (size, new_value) = {
            let mut treasure = treasure_arc.lock();
            let mut members = match treasure.value() {
                Value::Void => Vec::new(),
                Value::Uint32Slice(members) => members,
                _ => return Err(HydraideError::failed_precondition("treasure is not a uint32-slice")),
            };
            if let Err(index) = members.binary_search(&member) {
                members.insert(index, member);
            }
            let size = members.len();
            let new_value = Value::Uint32Slice(members);
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.set_value(token, new_value.clone())?;
            treasure.save(token, actor, now)?;
            guard.release().ok();
            (size, new_value)
        };
        self.reindex(key, &treasure_arc.lock());
        self.touch_updated_at(now);
        self.emit_save(key, &new_value);
        Ok(size)
    }

    /// Remove `member` from the `uint32-slice` Treasure at `key`. No-op if
    /// absent or the Treasure does not exist. Returns the slice's size
    /// after the removal (0 if the Treasure does not exist).
    pub fn slice_delete(&self, key: &str, member: u32, actor: Option<String>) -> HydraideResult<usize> {
        let Some(treasure_arc) = self.get_arc(key) else {
            return Ok(0);
        };
        let now = Utc::now();
        let (size, new_value) = {
            let mut treasure = treasure_arc.lock();
            if treasure.is_tombstoned() {
                return Ok(0);
            }
            let mut members = match treasure.value() {
                Value::Uint32Slice(members) => members,
                Value::Void => return Ok(0),
                _ => return Err(HydraideError::failed_precondition("treasure is not a uint32-slice")),
            };
            if let Ok(index) = members.binary_search(&member) {
                members.remove(index);
            }
            let size = members.len();
            let new_value = Value::Uint32Slice(members);
            let guard = treasure.start_guard(true);
            let token = guard.token();
            treasure.set_value(token, new_value.clone())?;
            treasure.save(token, actor, now)?;
            guard.release().ok();
            (size, new_value)
        };
        self.reindex(key, &treasure_arc.lock());
        self.touch_updated_at(now);
        self.emit_save(key, &new_value);
        Ok(size)
    }

    /// Current size of the `uint32-slice` Treasure at `key` (0 if absent).
    pub fn slice_size(&self, key: &str) -> HydraideResult<usize> {
        match self.get(key) {
            None => Ok(0),
            Some(Value::Void) => Ok(0),
            Some(Value::Uint32Slice(members)) => Ok(members.len()),
            Some(_) => Err(HydraideError::failed_precondition("treasure is not a uint32-slice")),
        }
    }

    /// Whether `member` is present in the `uint32-slice` Treasure at `key`.
    pub fn slice_contains(&self, key: &str, member: u32) -> HydraideResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Void) => Ok(false),
            Some(Value::Uint32Slice(members)) => Ok(members.binary_search(&member).is_ok()),
            Some(_) => Err(HydraideError::failed_precondition("treasure is not a uint32-slice")),
        }
    }

    /// Subscribe to per-Treasure save/delete events.
    pub fn subscribe_events(&self, client_id: impl Into<String>, capacity: usize) -> Receiver<TreasureEvent> {
        self.events.subscribe(client_id, capacity)
    }

    /// Stop delivering per-Treasure events to `client_id`.
    pub fn unsubscribe_events(&self, client_id: &str) {
        self.events.unsubscribe(client_id);
    }

    /// Subscribe to Swamp-level info (count) events.
    pub fn subscribe_info(&self, client_id: impl Into<String>, capacity: usize) -> Receiver<SwampInfo> {
        self.info_events.subscribe(client_id, capacity)
    }

    /// Stop delivering info events to `client_id`.
    pub fn unsubscribe_info(&self, client_id: &str) {
        self.info_events.unsubscribe(client_id);
    }

    /// Flush dirty state to the chunked store. Rewrites the Swamp's chunk
    /// files from scratch (compaction-on-flush), physically drops
    /// tombstoned Treasures, and removes on-disk artifacts (plus empty
    /// ancestor folders) if the Swamp ends up empty.
    pub fn flush(&self) -> HydraideResult<()> {
        if self.setting.in_memory_only {
            let mut state = self.state.lock();
            state.treasures.retain(|_, t| !t.lock().is_tombstoned());
            for t in state.treasures.values() {
                t.lock().clear_dirty();
            }
            return Ok(());
        }

        let mut state = self.state.lock();
        let tombstoned_keys: Vec<String> = state
            .treasures
            .iter()
            .filter(|(_, t)| t.lock().is_tombstoned())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &tombstoned_keys {
            state_unindex_key(&mut state.beacons, key);
            state.treasures.remove(key);
        }

        if state.treasures.is_empty() {
            drop(state);
            self.chunk_store.delete_all_files(&self.storage_path)?;
            self.chunk_store.delete_folder_if_empty(&self.storage_path, self.max_depth)?;
            return Ok(());
        }

        let created_at = state.created_at.unwrap_or_else(Utc::now);
        let mut records = Vec::with_capacity(state.treasures.len());
        for (key, treasure) in state.treasures.iter() {
            let treasure = treasure.lock();
            let metadata = treasure.metadata();
            records.push(TreasureRecord {
                key: key.clone(),
                value: treasure.value(),
                created_at: metadata.created_at,
                created_by: metadata.created_by,
                updated_at: metadata.updated_at,
                updated_by: metadata.updated_by,
                expire_at: metadata.expire_at,
                tombstone: false,
            });
        }
        for t in state.treasures.values() {
            t.lock().clear_dirty();
        }
        drop(state);

        self.chunk_store.delete_all_files(&self.storage_path)?;

        let max_bytes = self.setting.max_chunk_bytes.max(1) as usize;
        let metadata_segment = metadata::encode(created_at)?;
        let mut chunk_index = 0_usize;
        let mut current_segments: Vec<Vec<u8>> = vec![metadata_segment];
        let mut current_size = current_segments[0].len();

        for record in records {
            let segment = codec::encode_segment(&record)?;
            if current_size + segment.len() > max_bytes && !current_segments.is_empty() {
                self.write_chunk(chunk_index, &current_segments)?;
                chunk_index += 1;
                current_segments = Vec::new();
                current_size = 0;
            }
            current_size += segment.len();
            current_segments.push(segment);
        }
        if !current_segments.is_empty() {
            self.write_chunk(chunk_index, &current_segments)?;
        }
        Ok(())
    }

    fn write_chunk(&self, index: usize, segments: &[Vec<u8>]) -> HydraideResult<()> {
        let path = self.storage_path.join(format!("{CHUNK_FILE_PREFIX}{index:08}"));
        self.chunk_store.save_file(&path, segments, false, Algorithm::Snappy)
    }

    /// Destroy this Swamp: flush durable metadata, remove all on-disk
    /// artifacts regardless of remaining content, and mark it closing.
    pub fn destroy(&self) -> HydraideResult<()> {
        self.begin_closing();
        {
            let mut state = self.state.lock();
            state.treasures.clear();
            for beacon in state.beacons.values_mut() {
                *beacon = Beacon::new(beacon.kind());
            }
        }
        if !self.setting.in_memory_only {
            self.chunk_store.delete_all_files(&self.storage_path)?;
            self.chunk_store.delete_folder_if_empty(&self.storage_path, self.max_depth)?;
        }
        Ok(())
    }
}

fn state_unindex_key(beacons: &mut HashMap<BeaconKind, Beacon>, key: &str) {
    for beacon in beacons.values_mut() {
        beacon.remove(key);
    }
}

fn record_to_treasure(record: &TreasureRecord) -> HydraideResult<Treasure> {
    let mut treasure = Treasure::new(&record.key)?;
    let guard = treasure.start_guard(true);
    let token = guard.token();
    treasure.set_value(token, record.value.clone())?;
    if let Some(created_at) = record.created_at {
        treasure.set_created_at(token, created_at, record.created_by.clone())?;
    }
    treasure.set_expire_at(token, record.expire_at)?;
    treasure.save(token, record.updated_by.clone(), record.updated_at.unwrap_or_else(Utc::now))?;
    guard.release().ok();
    treasure.clear_dirty();
    Ok(treasure)
}

fn zero_like(value: &Value) -> Value {
    match value {
        Value::I8(_) => Value::I8(0),
        Value::I16(_) => Value::I16(0),
        Value::I32(_) => Value::I32(0),
        Value::I64(_) => Value::I64(0),
        Value::U8(_) => Value::U8(0),
        Value::U16(_) => Value::U16(0),
        Value::U32(_) => Value::U32(0),
        Value::U64(_) => Value::U64(0),
        Value::F32(_) => Value::F32(0.0),
        Value::F64(_) => Value::F64(0.0),
        other => other.clone(),
    }
}

fn add_numeric(current: &Value, delta: &Value) -> HydraideResult<Value> {
    let mismatch = || HydraideError::failed_precondition("increment type mismatch");
    Ok(match (current, delta) {
        (Value::I8(a), Value::I8(b)) => Value::I8(a.wrapping_add(*b)),
        (Value::I16(a), Value::I16(b)) => Value::I16(a.wrapping_add(*b)),
        (Value::I32(a), Value::I32(b)) => Value::I32(a.wrapping_add(*b)),
        (Value::I64(a), Value::I64(b)) => Value::I64(a.wrapping_add(*b)),
        (Value::U8(a), Value::U8(b)) => Value::U8(a.wrapping_add(*b)),
        (Value::U16(a), Value::U16(b)) => Value::U16(a.wrapping_add(*b)),
        (Value::U32(a), Value::U32(b)) => Value::U32(a.wrapping_add(*b)),
        (Value::U64(a), Value::U64(b)) => Value::U64(a.wrapping_add(*b)),
        (Value::F32(a), Value::F32(b)) => Value::F32(a + b),
        (Value::F64(a), Value::F64(b)) => Value::F64(a + b),
        _ => return Err(mismatch()),
    })
}

fn compare_numeric(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;
    Some(match (a, b) {
        (Value::I8(x), Value::I8(y)) => x.cmp(y),
        (Value::I16(x), Value::I16(y)) => x.cmp(y),
        (Value::I32(x), Value::I32(y)) => x.cmp(y),
        (Value::I64(x), Value::I64(y)) => x.cmp(y),
        (Value::U8(x), Value::U8(y)) => x.cmp(y),
        (Value::U16(x), Value::U16(y)) => x.cmp(y),
        (Value::U32(x), Value::U32(y)) => x.cmp(y),
        (Value::U64(x), Value::U64(y)) => x.cmp(y),
        (Value::F32(x), Value::F32(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::F64(x), Value::F64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => return None,
    })
}

fn condition_holds(op: ConditionOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        ConditionOp::Eq => ordering == Equal,
        ConditionOp::Ne => ordering != Equal,
        ConditionOp::Lt => ordering == Less,
        ConditionOp::Le => ordering != Greater,
        ConditionOp::Gt => ordering == Greater,
        ConditionOp::Ge => ordering != Less,
    }
}
