//! Engine-wide configuration: island count, storage path derivation knobs,
//! and the on-disk roots for chunk files and the settings snapshot.
//!
//! Loadable from a TOML file (`EngineConfig::from_toml_file`) or built
//! programmatically with the builder methods; either way `validate()` should
//! run before the config is handed to [`crate::supervisor::Supervisor`].

use hydraide_core::limits::{MAX_DEPTH_CEILING, MAX_FOLDERS_PER_LEVEL_CEILING};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Engine-wide configuration, analogous in role to the teacher's
/// `DatabaseConfig`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of shard "islands" a [`hydraide_core::name::Name`] routes
    /// across. The engine itself only uses this for path derivation, not
    /// for cross-process routing.
    pub island_count: u32,
    /// Directory levels in a Swamp's derived storage path.
    pub max_depth: u32,
    /// Maximum directory fan-out per storage-path level.
    pub max_folders_per_level: u32,
    /// Root directory under which every Swamp's hashed storage path lives.
    pub storage_root: PathBuf,
    /// Directory holding the settings registry's JSON snapshot file.
    pub settings_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            island_count: 16,
            max_depth: 3,
            max_folders_per_level: 100,
            storage_root: PathBuf::from("./data/swamps"),
            settings_dir: PathBuf::from("./data/settings"),
        }
    }
}

/// [`EngineConfig::validate`] failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `island_count` was zero.
    #[error("island_count must be positive")]
    ZeroIslandCount,
    /// `max_depth` was zero or exceeded the hard ceiling.
    #[error("max_depth must be in 1..={MAX_DEPTH_CEILING}, got {0}")]
    InvalidMaxDepth(u32),
    /// `max_folders_per_level` was zero or exceeded the hard ceiling.
    #[error("max_folders_per_level must be in 1..={MAX_FOLDERS_PER_LEVEL_CEILING}, got {0}")]
    InvalidMaxFoldersPerLevel(u32),
    /// The TOML document could not be parsed.
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config file could not be read.
    #[error("failed to read engine config file: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineConfig {
    /// Parse an [`EngineConfig`] from a TOML document. Unset fields take
    /// their [`Default`] value.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Load an [`EngineConfig`] from a TOML file on disk.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Override `storage_root`.
    pub fn with_storage_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_root = path.into();
        self
    }

    /// Override `settings_dir`.
    pub fn with_settings_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_dir = path.into();
        self
    }

    /// Override `island_count`.
    pub fn with_island_count(mut self, island_count: u32) -> Self {
        self.island_count = island_count;
        self
    }

    /// The settings registry's snapshot file path, under `settings_dir`.
    pub fn settings_snapshot_path(&self) -> PathBuf {
        self.settings_dir.join("settings.json")
    }

    /// Reject a config this engine could not safely run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.island_count == 0 {
            return Err(ConfigError::ZeroIslandCount);
        }
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_CEILING {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.max_folders_per_level == 0 || self.max_folders_per_level > MAX_FOLDERS_PER_LEVEL_CEILING {
            return Err(ConfigError::InvalidMaxFoldersPerLevel(self.max_folders_per_level));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_island_count_is_rejected() {
        let config = EngineConfig::default().with_island_count(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroIslandCount)));
    }

    #[test]
    fn max_depth_beyond_ceiling_is_rejected() {
        let mut config = EngineConfig::default();
        config.max_depth = MAX_DEPTH_CEILING + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxDepth(_))));
    }

    #[test]
    fn from_toml_str_overrides_only_given_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            island_count = 4
            storage_root = "/var/lib/hydraide/swamps"
            "#,
        )
        .unwrap();
        assert_eq!(config.island_count, 4);
        assert_eq!(config.storage_root, PathBuf::from("/var/lib/hydraide/swamps"));
        assert_eq!(config.max_depth, EngineConfig::default().max_depth);
    }

    #[test]
    fn settings_snapshot_path_is_under_settings_dir() {
        let config = EngineConfig::default().with_settings_dir("/tmp/hydraide-settings");
        assert_eq!(config.settings_snapshot_path(), PathBuf::from("/tmp/hydraide-settings/settings.json"));
    }

    #[test]
    fn malformed_toml_surfaces_a_parse_error() {
        let err = EngineConfig::from_toml_str("not = [valid").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
