//! Process-wide concurrency primitives: the per-Treasure guard-token
//! protocol, a lazily-populated per-path lock table, TTL-bounded
//! business-domain locks, and the safe-shutdown coordinator.

#![warn(missing_docs)]

pub mod business_lock;
pub mod guard;
pub mod path_lock;
pub mod safe_ops;

pub use business_lock::BusinessLockTable;
pub use guard::{Guard, GuardCell, GuardMismatch, GuardToken};
pub use path_lock::PathLockTable;
pub use safe_ops::{InFlightGuard, PanicSignal, SafeOps};
