//! Pattern → [`SwampSetting`] resolution.
//!
//! Patterns are [`Name`] values where any level may be the wildcard token.
//! `resolve` picks the most-specific registered pattern that matches; ties
//! (equal specificity) are broken by earliest registration, since the
//! source's own map-iteration order was explicitly left undefined and this
//! is the documented resolution this port settles on.

use hydraide_core::name::Name;
use parking_lot::RwLock;
use std::time::Duration;

/// Per-pattern configuration resolved for a concrete Swamp name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwampSetting {
    /// If true, persistence fields are ignored; idle close destroys the
    /// data rather than flushing it.
    pub in_memory_only: bool,
    /// How long a Swamp may sit with `vigil_count == 0` before closing.
    pub close_after_idle: Duration,
    /// How often a persistent Swamp flushes dirty Treasures. Ignored when
    /// `in_memory_only` is true.
    pub write_interval: Duration,
    /// Upper bound on a chunk file's on-disk (compressed) size. Ignored
    /// when `in_memory_only` is true.
    pub max_chunk_bytes: u64,
}

impl SwampSetting {
    /// The documented default applied when no registered pattern matches a
    /// Swamp name: `close_after_idle=5s`, `write_interval=1s`,
    /// `max_chunk_bytes=64 KiB`, persistent.
    pub fn default_setting() -> Self {
        Self {
            in_memory_only: false,
            close_after_idle: Duration::from_secs(5),
            write_interval: Duration::from_secs(1),
            max_chunk_bytes: 64 * 1024,
        }
    }
}

impl Default for SwampSetting {
    fn default() -> Self {
        Self::default_setting()
    }
}

/// Registry of pattern → [`SwampSetting`], resolved most-specific-first.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    patterns: RwLock<Vec<(Name, SwampSetting)>>,
}

impl SettingsRegistry {
    /// An empty registry; [`SettingsRegistry::resolve`] returns the
    /// documented default for every name until patterns are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace, if already registered) a pattern's setting.
    pub fn register(&self, pattern: Name, setting: SwampSetting) {
        let mut patterns = self.patterns.write();
        if let Some(existing) = patterns.iter_mut().find(|(p, _)| p == &pattern) {
            existing.1 = setting;
        } else {
            patterns.push((pattern, setting));
        }
    }

    /// Remove a pattern's registration, if present.
    pub fn deregister(&self, pattern: &Name) {
        self.patterns.write().retain(|(p, _)| p != pattern);
    }

    /// Resolve the setting for a concrete Swamp name: the most specific
    /// matching registered pattern, ties broken by earliest registration,
    /// falling back to [`SwampSetting::default_setting`].
    pub fn resolve(&self, name: &Name) -> SwampSetting {
        let patterns = self.patterns.read();
        let mut best: Option<(u8, &SwampSetting)> = None;
        for (pattern, setting) in patterns.iter() {
            if !pattern.matches(name) {
                continue;
            }
            let specificity = pattern.specificity();
            let replace = match best {
                Some((best_specificity, _)) => specificity > best_specificity,
                None => true,
            };
            if replace {
                best = Some((specificity, setting));
            }
        }
        best.map(|(_, setting)| *setting).unwrap_or_default()
    }

    /// Snapshot of every currently registered `(pattern, setting)` pair, in
    /// registration order.
    pub fn snapshot(&self) -> Vec<(Name, SwampSetting)> {
        self.patterns.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydraide_core::name::WILDCARD;

    fn setting(close_after_idle_secs: u64) -> SwampSetting {
        SwampSetting {
            close_after_idle: Duration::from_secs(close_after_idle_secs),
            ..SwampSetting::default_setting()
        }
    }

    #[test]
    fn unmatched_name_gets_the_default() {
        let registry = SettingsRegistry::new();
        let name = Name::new("acme", "chat", "sessions").unwrap();
        assert_eq!(registry.resolve(&name), SwampSetting::default_setting());
    }

    #[test]
    fn most_specific_pattern_wins() {
        let registry = SettingsRegistry::new();
        let name = Name::new("acme", "chat", "sessions").unwrap();

        registry.register(Name::pattern(WILDCARD, WILDCARD, WILDCARD).unwrap(), setting(1));
        registry.register(Name::pattern("acme", WILDCARD, WILDCARD).unwrap(), setting(2));
        registry.register(Name::pattern("acme", "chat", WILDCARD).unwrap(), setting(3));

        assert_eq!(registry.resolve(&name).close_after_idle, Duration::from_secs(3));
    }

    #[test]
    fn ties_break_by_earliest_registration() {
        let registry = SettingsRegistry::new();
        let name = Name::new("acme", "chat", "sessions").unwrap();

        registry.register(Name::pattern("acme", WILDCARD, WILDCARD).unwrap(), setting(1));
        registry.register(Name::pattern(WILDCARD, "chat", WILDCARD).unwrap(), setting(2));

        // Both patterns have specificity 1 and both match; the first
        // registered wins.
        assert_eq!(registry.resolve(&name).close_after_idle, Duration::from_secs(1));
    }

    #[test]
    fn deregister_falls_back_to_default() {
        let registry = SettingsRegistry::new();
        let pattern = Name::pattern("acme", WILDCARD, WILDCARD).unwrap();
        let name = Name::new("acme", "chat", "sessions").unwrap();
        registry.register(pattern.clone(), setting(9));
        assert_eq!(registry.resolve(&name).close_after_idle, Duration::from_secs(9));
        registry.deregister(&pattern);
        assert_eq!(registry.resolve(&name), SwampSetting::default_setting());
    }

    #[test]
    fn re_registering_a_pattern_replaces_its_setting() {
        let registry = SettingsRegistry::new();
        let pattern = Name::pattern("acme", WILDCARD, WILDCARD).unwrap();
        registry.register(pattern.clone(), setting(1));
        registry.register(pattern, setting(2));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
