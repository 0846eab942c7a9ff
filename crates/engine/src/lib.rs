//! The HydrAIDE engine: Swamp runtime, Hydra lifecycle manager, and the
//! supervisor that wires them together from an [`EngineConfig`].
//!
//! Threading model is synchronous: `std::thread` plus `parking_lot`
//! primitives, no async runtime. Background per-Swamp idle-close and
//! write-interval work each run on a dedicated thread parked on a
//! [`timer::Timer`].

#![warn(missing_docs)]

pub mod config;
pub mod events;
pub mod hydra;
pub mod supervisor;
pub mod swamp;
pub mod timer;

pub use config::EngineConfig;
pub use events::{EventBroker, SwampInfo, TreasureEvent};
pub use hydra::Hydra;
pub use supervisor::Supervisor;
pub use swamp::{ConditionOp, Swamp};
