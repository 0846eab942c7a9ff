//! Ambient sizing limits shared by the storage and engine crates.
//!
//! These are not Swamp-level settings (see `hydraide_durability::settings`
//! for those); they are hard compile-time-ish ceilings that keep a single
//! malformed name or runaway pattern from taking down the process.

/// Maximum length, in bytes, of a single `Name` level (Sanctuary, Realm, or
/// Swamp token).
pub const MAX_NAME_LEVEL_BYTES: usize = 256;

/// Maximum directory fan-out the storage path deriver will ever be asked
/// for, regardless of a Swamp's configured `max_folders_per_level`. Guards
/// against a misconfigured setting producing an unusable path.
pub const MAX_FOLDERS_PER_LEVEL_CEILING: u32 = 4096;

/// Maximum directory depth the storage path deriver will ever be asked for.
pub const MAX_DEPTH_CEILING: u32 = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceilings_are_positive() {
        assert!(MAX_NAME_LEVEL_BYTES > 0);
        assert!(MAX_FOLDERS_PER_LEVEL_CEILING > 0);
        assert!(MAX_DEPTH_CEILING > 0);
    }
}
