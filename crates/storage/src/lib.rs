//! Persistence primitives for a single Swamp: the Treasure cell, its
//! secondary indexes, and the chunked on-disk file format. The Swamp
//! runtime (in `hydraide-engine`) owns one instance of each of these per
//! live Swamp, plus its own TTL-expiry shift over that state.

#![warn(missing_docs)]

pub mod beacon;
pub mod chunk_store;
pub mod compressor;
pub mod treasure;

pub use beacon::{Beacon, BeaconKind, Order};
pub use chunk_store::ChunkStore;
pub use compressor::Algorithm;
pub use treasure::{Metadata, Treasure};
