//! The Hydra manager: the process-wide `Name -> live Swamp` registry.
//!
//! Owns the `absent -> hydrating -> live -> closing -> absent` state machine
//! per Swamp slot, the per-Swamp idle-close and write-interval background
//! threads, and the event/info subscription seam. Constructed as `Arc<Hydra>`
//! because its background threads call back into it by a weak handle; see
//! [`Hydra::new`].

use crate::events::{SwampInfo, TreasureEvent};
use crate::swamp::Swamp;
use crate::timer::{Timer, TimerOutcome};
use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::name::Name;
use hydraide_durability::settings::{SettingsRegistry, SwampSetting};
use hydraide_storage::chunk_store::ChunkStore;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Why a live Swamp was taken down. Logged only; callers don't observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClosedBy {
    IdleTimeout,
    EmptyAfterFlush,
    Destroyed,
    GracefulStop,
}

struct LiveSwamp {
    swamp: Arc<Swamp>,
    setting: SwampSetting,
    idle_timer: Arc<Timer>,
    flush_timer: Arc<Timer>,
    idle_thread: Mutex<Option<JoinHandle<()>>>,
    flush_thread: Mutex<Option<JoinHandle<()>>>,
    /// Set once a flush-on-idle-close has exhausted its retries. A
    /// quarantined Swamp stays resident (no data loss) and gets no further
    /// idle-close attempts until the process restarts.
    quarantined: AtomicBool,
}

/// Flush-on-close retry policy: bounded attempts with exponential backoff,
/// the same shape as the teacher's transaction `RetryConfig`
/// (`engine::database::transactions::RetryConfig`), generalized from
/// transaction-conflict retries to close-time flush retries.
const FLUSH_RETRY_ATTEMPTS: usize = 3;
const FLUSH_RETRY_BASE_DELAY_MS: u64 = 10;
const FLUSH_RETRY_MAX_DELAY_MS: u64 = 100;

fn flush_retry_delay(attempt: usize) -> Duration {
    let shift = attempt.min(63);
    let multiplier = 1u64 << shift;
    let delay_ms = FLUSH_RETRY_BASE_DELAY_MS.saturating_mul(multiplier);
    Duration::from_millis(delay_ms.min(FLUSH_RETRY_MAX_DELAY_MS))
}

enum Slot {
    Hydrating,
    Live(Arc<LiveSwamp>),
    Closing,
}

/// Central registry over `Name -> live Swamp`.
pub struct Hydra {
    registry: Mutex<HashMap<Name, Slot>>,
    changed: Condvar,
    settings: Arc<SettingsRegistry>,
    chunk_store: Arc<ChunkStore>,
    storage_root: PathBuf,
    max_depth: u32,
    max_folders_per_level: u32,
    stopping: AtomicBool,
}

impl Hydra {
    /// Build a Hydra manager. Returned as `Arc` since its background close
    /// threads hold a [`Weak`] reference back to it.
    pub fn new(
        settings: Arc<SettingsRegistry>,
        chunk_store: Arc<ChunkStore>,
        storage_root: PathBuf,
        max_depth: u32,
        max_folders_per_level: u32,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(HashMap::new()),
            changed: Condvar::new(),
            settings,
            chunk_store,
            storage_root,
            max_depth,
            max_folders_per_level,
            stopping: AtomicBool::new(false),
        })
    }

    fn storage_path_for(&self, name: &Name) -> PathBuf {
        let mut path = self.storage_root.clone();
        for component in name.storage_path_components(self.max_depth, self.max_folders_per_level) {
            path.push(component);
        }
        path
    }

    /// Return the live Swamp for `name`, hydrating it from disk (or creating
    /// it empty) if it isn't already resident. Waits out a concurrent
    /// hydration or close up to `timeout`.
    pub fn summon_swamp(self: &Arc<Self>, name: &Name, timeout: Duration) -> HydraideResult<Arc<Swamp>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut registry = self.registry.lock();
                match registry.get(name) {
                    Some(Slot::Live(live)) => return Ok(live.swamp.clone()),
                    Some(Slot::Hydrating) | Some(Slot::Closing) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            return Err(HydraideError::timeout(format!("summon timed out waiting on {name}")));
                        }
                        self.changed.wait_for(&mut registry, remaining);
                        continue;
                    }
                    None => {
                        if self.stopping.load(Ordering::SeqCst) {
                            return Err(HydraideError::failed_precondition("hydra is stopping; no new summons accepted"));
                        }
                        registry.insert(name.clone(), Slot::Hydrating);
                    }
                }
            }
            return self.finish_hydration(name);
        }
    }

    fn finish_hydration(self: &Arc<Self>, name: &Name) -> HydraideResult<Arc<Swamp>> {
        let setting = self.settings.resolve(name);
        let storage_path = self.storage_path_for(name);
        let result = if setting.in_memory_only {
            Ok(Swamp::new_empty(name.clone(), setting, self.chunk_store.clone(), storage_path, self.max_depth))
        } else {
            Swamp::hydrate(name.clone(), setting, self.chunk_store.clone(), storage_path, self.max_depth)
        };

        let swamp = match result {
            Ok(swamp) => Arc::new(swamp),
            Err(e) => {
                let mut registry = self.registry.lock();
                registry.remove(name);
                self.changed.notify_all();
                return Err(e);
            }
        };

        let live = Arc::new(LiveSwamp {
            swamp: swamp.clone(),
            setting,
            idle_timer: Arc::new(Timer::new()),
            flush_timer: Arc::new(Timer::new()),
            idle_thread: Mutex::new(None),
            flush_thread: Mutex::new(None),
            quarantined: AtomicBool::new(false),
        });
        live.idle_timer.arm(setting.close_after_idle);
        if !setting.in_memory_only {
            live.flush_timer.arm(setting.write_interval);
        }
        self.spawn_background_threads(name.clone(), live.clone());

        {
            let mut registry = self.registry.lock();
            registry.insert(name.clone(), Slot::Live(live));
        }
        self.changed.notify_all();
        tracing::info!(name = %name, "swamp summoned");
        Ok(swamp)
    }

    fn spawn_background_threads(self: &Arc<Self>, name: Name, live: Arc<LiveSwamp>) {
        let idle_handle = {
            let hydra: Weak<Hydra> = Arc::downgrade(self);
            let swamp = live.swamp.clone();
            let idle_timer = live.idle_timer.clone();
            let close_after_idle = live.setting.close_after_idle;
            let name = name.clone();
            thread::spawn(move || loop {
                match idle_timer.wait() {
                    TimerOutcome::Stopped => return,
                    TimerOutcome::Fired => {
                        if swamp.vigil_count() > 0 {
                            idle_timer.arm(close_after_idle);
                            continue;
                        }
                        if let Some(hydra) = hydra.upgrade() {
                            hydra.close_live_swamp(&name, ClosedBy::IdleTimeout);
                        }
                        return;
                    }
                }
            })
        };
        *live.idle_thread.lock() = Some(idle_handle);

        if live.setting.in_memory_only {
            return;
        }
        let flush_handle = {
            let hydra: Weak<Hydra> = Arc::downgrade(self);
            let swamp = live.swamp.clone();
            let flush_timer = live.flush_timer.clone();
            let write_interval = live.setting.write_interval;
            let name = name.clone();
            thread::spawn(move || loop {
                match flush_timer.wait() {
                    TimerOutcome::Stopped => return,
                    TimerOutcome::Fired => {
                        if let Err(e) = swamp.flush() {
                            tracing::warn!(name = %name, error = %e, "scheduled flush failed");
                        }
                        if swamp.is_empty() {
                            if let Some(hydra) = hydra.upgrade() {
                                hydra.close_live_swamp(&name, ClosedBy::EmptyAfterFlush);
                            }
                            return;
                        }
                        flush_timer.arm(write_interval);
                    }
                }
            })
        };
        *live.flush_thread.lock() = Some(flush_handle);
    }

    /// Transition a live slot through `closing` back to `absent`. A no-op if
    /// `name` isn't currently live (already closing, or raced away).
    fn close_live_swamp(self: &Arc<Self>, name: &Name, reason: ClosedBy) {
        let live = {
            let mut registry = self.registry.lock();
            match registry.remove(name) {
                Some(Slot::Live(live)) => {
                    registry.insert(name.clone(), Slot::Closing);
                    live
                }
                Some(other) => {
                    registry.insert(name.clone(), other);
                    return;
                }
                None => return,
            }
        };

        live.idle_timer.stop();
        live.flush_timer.stop();
        join_unless_current(&live.idle_thread);
        join_unless_current(&live.flush_thread);

        if !live.setting.in_memory_only {
            let mut last_err = live.swamp.flush().err();
            if last_err.is_some() && reason == ClosedBy::IdleTimeout {
                for attempt in 0..FLUSH_RETRY_ATTEMPTS {
                    thread::sleep(flush_retry_delay(attempt));
                    match live.swamp.flush() {
                        Ok(()) => {
                            last_err = None;
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
            }
            if let Some(e) = last_err {
                if reason == ClosedBy::IdleTimeout {
                    live.quarantined.store(true, Ordering::SeqCst);
                    tracing::error!(
                        name = %name,
                        error = %e,
                        "flush failed after retries on idle close; swamp quarantined and stays resident"
                    );
                    let mut registry = self.registry.lock();
                    registry.insert(name.clone(), Slot::Live(live));
                    self.changed.notify_all();
                    return;
                }
                tracing::error!(name = %name, error = %e, "final flush on close failed; swamp data may be stale on disk");
            }
        }

        {
            let mut registry = self.registry.lock();
            registry.remove(name);
        }
        self.changed.notify_all();
        tracing::info!(name = %name, ?reason, "swamp closed");
    }

    /// True if `name` is currently live but quarantined after a failed
    /// flush-on-idle-close. Quarantined Swamps keep serving reads/writes;
    /// only the background idle-close retry is suppressed.
    pub fn is_swamp_quarantined(&self, name: &Name) -> bool {
        matches!(
            self.registry.lock().get(name),
            Some(Slot::Live(live)) if live.quarantined.load(Ordering::SeqCst)
        )
    }

    /// Fast existence check: the live registry first, then (without
    /// hydrating) whether the Swamp's storage folder exists on disk.
    pub fn is_exist_swamp(&self, name: &Name) -> bool {
        if matches!(self.registry.lock().get(name), Some(Slot::Live(_))) {
            return true;
        }
        self.chunk_store.is_folder_exists(&self.storage_path_for(name))
    }

    /// Snapshot of currently live Swamp names.
    pub fn list_active_swamps(&self) -> Vec<Name> {
        self.registry
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Live(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of currently live Swamps.
    pub fn count_active_swamps(&self) -> usize {
        self.registry.lock().values().filter(|slot| matches!(slot, Slot::Live(_))).count()
    }

    /// Summon (if needed), destroy, and unload `name`.
    pub fn destroy_swamp(self: &Arc<Self>, name: &Name, timeout: Duration) -> HydraideResult<()> {
        let swamp = self.summon_swamp(name, timeout)?;
        swamp.destroy()?;
        self.close_live_swamp(name, ClosedBy::Destroyed);
        Ok(())
    }

    /// Subscribe to per-Treasure events for `name`, summoning it first.
    pub fn subscribe_to_swamp_events(
        self: &Arc<Self>,
        client_id: impl Into<String>,
        name: &Name,
        timeout: Duration,
        capacity: usize,
    ) -> HydraideResult<Receiver<TreasureEvent>> {
        let swamp = self.summon_swamp(name, timeout)?;
        Ok(swamp.subscribe_events(client_id, capacity))
    }

    /// Stop delivering per-Treasure events to `client_id` for `name`. A
    /// no-op if `name` isn't currently live.
    pub fn unsubscribe_from_swamp_events(&self, name: &Name, client_id: &str) {
        if let Some(Slot::Live(live)) = self.registry.lock().get(name) {
            live.swamp.unsubscribe_events(client_id);
        }
    }

    /// Subscribe to Swamp-level info events for `name`, summoning it first.
    pub fn subscribe_to_swamp_info(
        self: &Arc<Self>,
        client_id: impl Into<String>,
        name: &Name,
        timeout: Duration,
        capacity: usize,
    ) -> HydraideResult<Receiver<SwampInfo>> {
        let swamp = self.summon_swamp(name, timeout)?;
        Ok(swamp.subscribe_info(client_id, capacity))
    }

    /// Stop delivering info events to `client_id` for `name`. A no-op if
    /// `name` isn't currently live.
    pub fn unsubscribe_from_swamp_info(&self, name: &Name, client_id: &str) {
        if let Some(Slot::Live(live)) = self.registry.lock().get(name) {
            live.swamp.unsubscribe_info(client_id);
        }
    }

    /// Refuse new summons, close every live Swamp, and return once all of
    /// them have unloaded. In-flight hydrations that complete after the
    /// stop flag is set are still closed, not abandoned.
    pub fn graceful_stop(self: &Arc<Self>) {
        self.stopping.store(true, Ordering::SeqCst);
        loop {
            let live_names: Vec<Name> = self
                .registry
                .lock()
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Live(_)))
                .map(|(name, _)| name.clone())
                .collect();
            if live_names.is_empty() {
                break;
            }
            for name in live_names {
                self.close_live_swamp(&name, ClosedBy::GracefulStop);
            }
        }
    }
}

fn join_unless_current(handle_cell: &Mutex<Option<JoinHandle<()>>>) {
    let handle = handle_cell.lock().take();
    if let Some(handle) = handle {
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}
