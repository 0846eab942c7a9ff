//! The HydrAIDE facade: a thin, wire-protocol-independent entry point over
//! the engine's Swamp/Hydra/Supervisor stack.
//!
//! `hydraide-api` adds no state of its own beyond what [`Client`] wraps; it
//! exists to give embedders one type to hold instead of wiring
//! `hydraide-engine` and `hydraide-durability` themselves.

#![warn(missing_docs)]

pub mod client;

pub use client::{parse_swamp_name, Client, DEFAULT_SUBSCRIPTION_CAPACITY, DEFAULT_SUMMON_TIMEOUT};
