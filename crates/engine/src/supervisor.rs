//! Process wiring: builds the settings registry, chunk store, and Hydra
//! manager from an [`EngineConfig`], installs the global tracing subscriber,
//! and runs the panic watcher that turns a caught panic into a graceful
//! stop instead of a process abort.

use crate::config::EngineConfig;
use crate::hydra::Hydra;
use hydraide_core::error::HydraideResult;
use hydraide_durability::settings::SettingsRegistry;
use hydraide_durability::snapshot;
use hydraide_storage::chunk_store::ChunkStore;
use hydraide_concurrency::{BusinessLockTable, SafeOps};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Owns the long-lived process singletons: the settings registry, the
/// Hydra manager, the [`SafeOps`] coordinator, the business-lock table, and
/// the panic watcher thread.
pub struct Supervisor {
    config: EngineConfig,
    settings: Arc<SettingsRegistry>,
    hydra: Arc<Hydra>,
    safe_ops: Arc<SafeOps>,
    business_locks: Arc<BusinessLockTable>,
    panic_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Validate `config`, install the global tracing subscriber (best
    /// effort — a subscriber already installed by the embedding process is
    /// left alone), reload the settings snapshot, and wire up the Hydra
    /// manager and panic watcher.
    pub fn start(config: EngineConfig) -> HydraideResult<Arc<Self>> {
        config.validate().map_err(|e| hydraide_core::error::HydraideError::invalid_argument(e.to_string()))?;
        let _ = tracing_subscriber::fmt::try_init();

        let settings = Arc::new(snapshot::load_snapshot(&config.settings_snapshot_path())?);
        let chunk_store = Arc::new(ChunkStore::new());
        let hydra = Hydra::new(
            settings.clone(),
            chunk_store,
            config.storage_root.clone(),
            config.max_depth,
            config.max_folders_per_level,
        );
        let safe_ops = Arc::new(SafeOps::new());
        let business_locks = Arc::new(BusinessLockTable::new());

        let supervisor = Arc::new(Self {
            config,
            settings,
            hydra,
            safe_ops,
            business_locks,
            panic_watcher: Mutex::new(None),
        });
        supervisor.spawn_panic_watcher();
        tracing::info!("supervisor started");
        Ok(supervisor)
    }

    fn spawn_panic_watcher(self: &Arc<Self>) {
        let Some(panic_rx) = self.safe_ops.monitor_panic() else {
            return;
        };
        let hydra = self.hydra.clone();
        let handle = std::thread::spawn(move || {
            if panic_rx.recv().is_ok() {
                tracing::error!("panic signal received; initiating graceful stop instead of aborting");
                hydra.graceful_stop();
            }
        });
        *self.panic_watcher.lock() = Some(handle);
    }

    /// The active engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The Hydra manager.
    pub fn hydra(&self) -> &Arc<Hydra> {
        &self.hydra
    }

    /// The settings registry.
    pub fn settings(&self) -> &Arc<SettingsRegistry> {
        &self.settings
    }

    /// The process-wide safe-shutdown coordinator.
    pub fn safe_ops(&self) -> &Arc<SafeOps> {
        &self.safe_ops
    }

    /// The business-domain cross-cutting lock table.
    pub fn business_locks(&self) -> &Arc<BusinessLockTable> {
        &self.business_locks
    }

    /// Persist the current settings registry to its snapshot file.
    pub fn save_settings_snapshot(&self) -> HydraideResult<()> {
        snapshot::save_snapshot(&self.config.settings_snapshot_path(), &self.settings)
    }

    /// Quiesce in-flight operations, close every live Swamp, and persist the
    /// settings snapshot. Idempotent: safe to call more than once.
    pub fn graceful_stop(&self) {
        self.safe_ops.wait_for_unlock();
        self.hydra.graceful_stop();
        if let Err(e) = self.save_settings_snapshot() {
            tracing::error!(error = %e, "failed to persist settings snapshot during graceful stop");
        }
        tracing::info!("supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> EngineConfig {
        EngineConfig::default()
            .with_storage_root(dir.join("swamps"))
            .with_settings_dir(dir.join("settings"))
    }

    #[test]
    fn start_wires_an_empty_hydra_and_settings_registry() {
        let dir = tempdir().unwrap();
        let supervisor = Supervisor::start(config(dir.path())).unwrap();
        assert_eq!(supervisor.hydra().count_active_swamps(), 0);
        assert_eq!(supervisor.settings().snapshot().len(), 0);
    }

    #[test]
    fn graceful_stop_persists_the_settings_snapshot() {
        let dir = tempdir().unwrap();
        let supervisor = Supervisor::start(config(dir.path())).unwrap();
        let pattern = hydraide_core::name::Name::pattern("acme", hydraide_core::name::WILDCARD, hydraide_core::name::WILDCARD).unwrap();
        supervisor.settings().register(pattern, hydraide_durability::settings::SwampSetting::default_setting());

        supervisor.graceful_stop();

        assert!(supervisor.config().settings_snapshot_path().exists());
    }

    #[test]
    fn invalid_config_is_rejected_before_anything_is_wired() {
        let dir = tempdir().unwrap();
        let config = config(dir.path()).with_island_count(0);
        assert!(Supervisor::start(config).is_err());
    }
}
