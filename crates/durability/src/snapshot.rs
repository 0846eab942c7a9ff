//! Persistent JSON snapshot of the settings registry, so a restart reloads
//! registered patterns instead of starting from documented defaults only.

use crate::settings::{SettingsRegistry, SwampSetting};
use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::name::Name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct PatternEntry {
    #[serde(rename = "nameCanonicalForm")]
    name_canonical_form: String,
    #[serde(rename = "inMemory")]
    in_memory: bool,
    #[serde(rename = "closeAfterIdleSec")]
    close_after_idle_sec: u64,
    #[serde(rename = "writeIntervalSec")]
    write_interval_sec: u64,
    #[serde(rename = "maxFileSizeByte")]
    max_file_size_byte: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    patterns: BTreeMap<String, PatternEntry>,
}

/// Write every registered pattern in `registry` to `path` as a single JSON
/// document. Fields inapplicable to an in-memory-only pattern are written
/// as zero.
pub fn save_snapshot(path: &Path, registry: &SettingsRegistry) -> HydraideResult<()> {
    let mut patterns = BTreeMap::new();
    for (name, setting) in registry.snapshot() {
        let canonical = name.canonical();
        let entry = PatternEntry {
            name_canonical_form: canonical.clone(),
            in_memory: setting.in_memory_only,
            close_after_idle_sec: setting.close_after_idle.as_secs(),
            write_interval_sec: if setting.in_memory_only {
                0
            } else {
                setting.write_interval.as_secs()
            },
            max_file_size_byte: if setting.in_memory_only {
                0
            } else {
                setting.max_chunk_bytes
            },
        };
        patterns.insert(canonical, entry);
    }
    let document = SnapshotDocument { patterns };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| HydraideError::internal(format!("settings snapshot serialization failed: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a settings registry from a snapshot previously written by
/// [`save_snapshot`]. A missing file yields an empty registry (first boot).
pub fn load_snapshot(path: &Path) -> HydraideResult<SettingsRegistry> {
    let registry = SettingsRegistry::new();
    let json = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(registry),
        Err(e) => return Err(e.into()),
    };
    let document: SnapshotDocument = serde_json::from_str(&json)
        .map_err(|e| HydraideError::internal(format!("settings snapshot parse failed: {e}")))?;
    for (canonical, entry) in document.patterns {
        let name = Name::from_canonical(&canonical)
            .map_err(|e| HydraideError::internal(format!("settings snapshot has bad pattern {canonical}: {e}")))?;
        let setting = SwampSetting {
            in_memory_only: entry.in_memory,
            close_after_idle: std::time::Duration::from_secs(entry.close_after_idle_sec),
            write_interval: std::time::Duration::from_secs(entry.write_interval_sec),
            max_chunk_bytes: entry.max_file_size_byte,
        };
        registry.register(name, setting);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydraide_core::name::WILDCARD;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_roundtrips_patterns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings/snapshot.json");

        let registry = SettingsRegistry::new();
        registry.register(
            Name::pattern("acme", WILDCARD, WILDCARD).unwrap(),
            SwampSetting {
                in_memory_only: false,
                close_after_idle: Duration::from_secs(30),
                write_interval: Duration::from_secs(2),
                max_chunk_bytes: 128 * 1024,
            },
        );
        save_snapshot(&path, &registry).unwrap();

        let reloaded = load_snapshot(&path).unwrap();
        let resolved = reloaded.resolve(&Name::new("acme", "chat", "sessions").unwrap());
        assert_eq!(resolved.close_after_idle, Duration::from_secs(30));
        assert_eq!(resolved.write_interval, Duration::from_secs(2));
        assert_eq!(resolved.max_chunk_bytes, 128 * 1024);
    }

    #[test]
    fn in_memory_pattern_writes_zeroed_persistence_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let registry = SettingsRegistry::new();
        registry.register(
            Name::pattern("acme", WILDCARD, WILDCARD).unwrap(),
            SwampSetting {
                in_memory_only: true,
                close_after_idle: Duration::from_secs(5),
                write_interval: Duration::from_secs(99),
                max_chunk_bytes: 99,
            },
        );
        save_snapshot(&path, &registry).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"writeIntervalSec\": 0"));
        assert!(contents.contains("\"maxFileSizeByte\": 0"));
    }

    #[test]
    fn missing_file_loads_an_empty_registry() {
        let dir = tempdir().unwrap();
        let registry = load_snapshot(&dir.path().join("does-not-exist.json")).unwrap();
        assert_eq!(registry.snapshot().len(), 0);
    }
}
