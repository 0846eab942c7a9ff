//! Durable configuration and wire formats: the settings registry and its
//! JSON snapshot, and the versioned binary codecs for Swamp metadata and
//! Treasure segments.

#![warn(missing_docs)]

pub mod codec;
pub mod metadata;
pub mod settings;
pub mod snapshot;

pub use codec::TreasureRecord;
pub use settings::{SettingsRegistry, SwampSetting};
