//! Hierarchical Swamp naming: Sanctuary → Realm → Swamp, plus the
//! deterministic hash used to route a name to a shard and to a storage path.

use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Separator used in the canonical string form of a [`Name`].
///
/// Implementation-local and stable: once chosen it must never change, since
/// it feeds the hash that derives shard ids and on-disk paths.
const CANONICAL_SEPARATOR: char = '/';

/// Wildcard token recognized by the settings registry when matching
/// registered patterns against concrete Swamp names. Never valid in a
/// concrete (routable) name.
pub const WILDCARD: &str = "*";

/// A non-empty, three-level Swamp name: `(Sanctuary, Realm, Swamp)`.
///
/// `Name` is also used to express settings *patterns*, where any level may
/// be the wildcard token [`WILDCARD`]. Pattern names are never summoned
/// directly; see `hydraide_durability::settings`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    sanctuary: String,
    realm: String,
    swamp: String,
}

/// A level of a [`Name`] was empty where a non-empty token is required.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("name level must not be empty")]
pub struct EmptyNameLevel;

/// [`Name::from_canonical`] could not parse its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseNameError {
    /// The canonical string did not split into exactly three levels.
    #[error("expected 3 name levels separated by '{CANONICAL_SEPARATOR}', found {0}")]
    WrongLevelCount(usize),
    /// One of the three levels was empty.
    #[error(transparent)]
    EmptyLevel(#[from] EmptyNameLevel),
}

impl Name {
    /// Build a concrete (non-pattern) Swamp name. All three levels must be
    /// non-empty.
    pub fn new(
        sanctuary: impl Into<String>,
        realm: impl Into<String>,
        swamp: impl Into<String>,
    ) -> Result<Self, EmptyNameLevel> {
        let sanctuary = sanctuary.into();
        let realm = realm.into();
        let swamp = swamp.into();
        if sanctuary.is_empty() || realm.is_empty() || swamp.is_empty() {
            return Err(EmptyNameLevel);
        }
        Ok(Self {
            sanctuary,
            realm,
            swamp,
        })
    }

    /// Build a pattern name for settings registration; any level may be
    /// [`WILDCARD`], but none may be empty.
    pub fn pattern(
        sanctuary: impl Into<String>,
        realm: impl Into<String>,
        swamp: impl Into<String>,
    ) -> Result<Self, EmptyNameLevel> {
        Self::new(sanctuary, realm, swamp)
    }

    /// Parse a name back out of its [`Name::canonical`] string form, as
    /// used when reloading the settings snapshot.
    pub fn from_canonical(canonical: &str) -> Result<Self, ParseNameError> {
        let parts: Vec<&str> = canonical.split(CANONICAL_SEPARATOR).collect();
        let [sanctuary, realm, swamp] = parts.as_slice() else {
            return Err(ParseNameError::WrongLevelCount(parts.len()));
        };
        Self::new(*sanctuary, *realm, *swamp).map_err(ParseNameError::from)
    }

    /// The Sanctuary level.
    pub fn sanctuary(&self) -> &str {
        &self.sanctuary
    }

    /// The Realm level.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// The Swamp level.
    pub fn swamp(&self) -> &str {
        &self.swamp
    }

    /// True if any level of this name is the wildcard token.
    pub fn is_pattern(&self) -> bool {
        self.sanctuary == WILDCARD || self.realm == WILDCARD || self.swamp == WILDCARD
    }

    /// Does this (possibly wildcarded) name match a concrete routable name?
    ///
    /// `self` is treated as the pattern; `other` must be concrete (callers
    /// summoning a Swamp never pass a pattern here).
    pub fn matches(&self, other: &Name) -> bool {
        Self::level_matches(&self.sanctuary, &other.sanctuary)
            && Self::level_matches(&self.realm, &other.realm)
            && Self::level_matches(&self.swamp, &other.swamp)
    }

    fn level_matches(pattern_level: &str, concrete_level: &str) -> bool {
        pattern_level == WILDCARD || pattern_level == concrete_level
    }

    /// Specificity score used to rank competing pattern matches:
    /// one point per concrete (non-wildcard) level. A fully concrete name
    /// scores 3, `*/*/*` scores 0.
    pub fn specificity(&self) -> u8 {
        [&self.sanctuary, &self.realm, &self.swamp]
            .iter()
            .filter(|level| level.as_str() != WILDCARD)
            .count() as u8
    }

    /// The canonical string form: `"<Sanctuary>/<Realm>/<Swamp>"`.
    pub fn canonical(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.sanctuary, CANONICAL_SEPARATOR, self.realm, CANONICAL_SEPARATOR, self.swamp
        )
    }

    /// A stable, non-cryptographic 64-bit hash of the canonical name.
    fn hash64(&self) -> u64 {
        xxh3_64(self.canonical().as_bytes())
    }

    /// Deterministic shard id in `[0, island_count)`.
    ///
    /// # Panics
    /// Panics if `island_count == 0`; the caller configured zero islands,
    /// which is a startup error, not a routing one.
    pub fn shard_id(&self, island_count: u32) -> u32 {
        assert!(island_count > 0, "island_count must be positive");
        (self.hash64() % island_count as u64) as u32
    }

    /// Relative storage path: `max_depth` directory components, each the
    /// name's hash split into 4-bit (nibble) groups, reduced modulo
    /// `max_folders_per_level` so no directory level exceeds that fan-out.
    ///
    /// A 64-bit hash carries 16 nibbles; deeper paths re-hash the previous
    /// round's digest to keep drawing nibbles without repeating a short
    /// cycle.
    pub fn storage_path_components(&self, max_depth: u32, max_folders_per_level: u32) -> Vec<String> {
        assert!(max_folders_per_level > 0, "max_folders_per_level must be positive");
        let mut components = Vec::with_capacity(max_depth as usize);
        let mut digest = self.hash64();
        for i in 0..max_depth {
            let nibble_index = (i % 16) as u32;
            if i > 0 && nibble_index == 0 {
                digest = xxh3_64(&digest.to_le_bytes());
            }
            let nibble = (digest >> (4 * nibble_index)) & 0xF;
            let folder = nibble % max_folders_per_level as u64;
            components.push(folder.to_string());
        }
        components
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_levels() {
        assert!(Name::new("", "realm", "swamp").is_err());
        assert!(Name::new("s", "", "swamp").is_err());
        assert!(Name::new("s", "realm", "").is_err());
    }

    #[test]
    fn canonical_form_joins_with_slash() {
        let n = Name::new("acme", "chat", "sessions").unwrap();
        assert_eq!(n.canonical(), "acme/chat/sessions");
        assert_eq!(n.to_string(), "acme/chat/sessions");
    }

    #[test]
    fn shard_id_is_deterministic_and_in_range() {
        let n = Name::new("acme", "chat", "sessions").unwrap();
        let a = n.shard_id(16);
        let b = n.shard_id(16);
        assert_eq!(a, b);
        assert!(a < 16);
    }

    #[test]
    fn different_names_usually_shard_differently() {
        let n1 = Name::new("acme", "chat", "sessions-1").unwrap();
        let n2 = Name::new("acme", "chat", "sessions-2").unwrap();
        // Not a hard guarantee for any hash, but true for these two inputs
        // against a large island count; documents intended spread.
        assert_ne!(n1.shard_id(1_000_000), n2.shard_id(1_000_000));
    }

    #[test]
    fn storage_path_is_deterministic_and_bounded() {
        let n = Name::new("acme", "chat", "sessions").unwrap();
        let p1 = n.storage_path_components(3, 16);
        let p2 = n.storage_path_components(3, 16);
        assert_eq!(p1, p2);
        assert_eq!(p1.len(), 3);
        for component in &p1 {
            let value: u32 = component.parse().unwrap();
            assert!(value < 16);
        }
    }

    #[test]
    fn storage_path_supports_depth_beyond_one_hash_width() {
        let n = Name::new("acme", "chat", "sessions").unwrap();
        let p = n.storage_path_components(20, 8);
        assert_eq!(p.len(), 20);
    }

    #[test]
    fn pattern_matches_wildcard_levels() {
        let pattern = Name::pattern(WILDCARD, "chat", WILDCARD).unwrap();
        let concrete = Name::new("acme", "chat", "sessions").unwrap();
        let other_realm = Name::new("acme", "support", "sessions").unwrap();
        assert!(pattern.matches(&concrete));
        assert!(!pattern.matches(&other_realm));
    }

    #[test]
    fn specificity_counts_concrete_levels() {
        assert_eq!(Name::new("a", "b", "c").unwrap().specificity(), 3);
        assert_eq!(Name::pattern(WILDCARD, "b", "c").unwrap().specificity(), 2);
        assert_eq!(
            Name::pattern(WILDCARD, WILDCARD, WILDCARD).unwrap().specificity(),
            0
        );
    }

    #[test]
    fn from_canonical_roundtrips() {
        let n = Name::new("acme", "chat", "sessions").unwrap();
        let parsed = Name::from_canonical(&n.canonical()).unwrap();
        assert_eq!(n, parsed);
    }

    #[test]
    fn from_canonical_rejects_wrong_level_count() {
        assert!(Name::from_canonical("acme/chat").is_err());
        assert!(Name::from_canonical("acme/chat/sessions/extra").is_err());
    }

    #[test]
    fn ordering_is_total_for_use_in_sorted_containers() {
        let a = Name::new("a", "b", "c").unwrap();
        let b = Name::new("a", "b", "d").unwrap();
        assert!(a < b);
    }
}
