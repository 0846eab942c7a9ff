//! # HydrAIDE
//!
//! An embedded, hierarchical key-value engine: Sanctuary → Realm → Swamp
//! namespacing, on-demand Swamp hydration, chunked compressed persistence,
//! and a guard-token mutation protocol.
//!
//! ```no_run
//! use hydraide::{Client, EngineConfig, Name, Value};
//!
//! fn main() -> hydraide::error::HydraideResult<()> {
//!     let client = Client::start(EngineConfig::default())?;
//!     let swamp = Name::new("acme", "chat", "sessions").expect("non-empty levels");
//!
//!     client.set(&swamp, vec![("user:1".into(), Value::String("Alice".into()))], true, true)?;
//!     assert_eq!(client.get(&swamp, &["user:1".into()])?, vec![Some(Value::String("Alice".into()))]);
//!
//!     client.graceful_stop();
//!     Ok(())
//! }
//! ```
//!
//! Internal crates (`hydraide-core`, `hydraide-storage`, `hydraide-concurrency`,
//! `hydraide-durability`, `hydraide-engine`) are implementation detail; only
//! the [`hydraide_api`] facade re-exported here is a stable surface.

pub use hydraide_api::*;
pub use hydraide_core::error;
pub use hydraide_core::name::Name;
pub use hydraide_core::outcome::CreateOutcome;
pub use hydraide_core::value::Value;
pub use hydraide_engine::EngineConfig;
