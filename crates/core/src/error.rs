//! The unified error taxonomy for HydrAIDE operations.
//!
//! Every public operation across `hydraide-storage`, `hydraide-durability`,
//! `hydraide-engine` and `hydraide-api` returns [`HydraideResult<T>`]. The
//! kinds below are the taxonomy from the error handling design: not type
//! names for each failure site, but the small set of *kinds* callers branch
//! on (retry, surface to user, or treat as a bug).

use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias used throughout the engine.
pub type HydraideResult<T> = std::result::Result<T, HydraideError>;

/// The unified error type for HydrAIDE operations.
///
/// ## Example
/// ```
/// use hydraide_core::error::HydraideError;
///
/// fn example() -> Result<(), HydraideError> {
///     Err(HydraideError::invalid_argument("key must not be empty"))
/// }
///
/// match example() {
///     Err(e) if e.is_retryable() => { /* retry */ }
///     Err(e) => println!("{e}"),
///     Ok(()) => {}
/// }
/// ```
#[derive(Debug, Error)]
pub enum HydraideError {
    /// Empty path/name, malformed key, or wrong value type for a mutator.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// A Treasure key or business lock was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// The named Swamp does not exist on disk and is not live.
    #[error("swamp not found: {name}")]
    SwampNotFound {
        /// Canonical name of the missing Swamp.
        name: String,
    },

    /// A create-only insert collided with an existing key.
    #[error("already exists: {message}")]
    AlreadyExists {
        /// Description of what already existed.
        message: String,
    },

    /// A typed increment precondition failed; carries the current value so
    /// the caller can decide whether to retry.
    #[error("condition not met on {key}: current value is {current:?}")]
    ConditionNotMet {
        /// The Treasure key the precondition was checked against.
        key: String,
        /// The value actually found.
        current: Value,
    },

    /// A type-class mismatch on a typed slice/increment operation (e.g. a
    /// push onto a non-`uint32-slice` Treasure).
    #[error("failed precondition: {message}")]
    FailedPrecondition {
        /// What precondition failed.
        message: String,
    },

    /// The operation's deadline elapsed before it completed.
    #[error("operation timed out: {message}")]
    Timeout {
        /// Context for what timed out.
        message: String,
    },

    /// The operation was cancelled by its caller before completion.
    #[error("operation cancelled: {message}")]
    Cancelled {
        /// Context for what was cancelled.
        message: String,
    },

    /// A retryable I/O or compression failure (e.g. a transient filesystem
    /// error). Callers may retry.
    #[error("transient error: {message}")]
    Transient {
        /// Description of the transient failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal invariant was violated. Crash-worthy; indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl HydraideError {
    /// Build an [`HydraideError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        HydraideError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        HydraideError::NotFound {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::SwampNotFound`].
    pub fn swamp_not_found(name: impl Into<String>) -> Self {
        HydraideError::SwampNotFound { name: name.into() }
    }

    /// Build an [`HydraideError::AlreadyExists`].
    pub fn already_exists(message: impl Into<String>) -> Self {
        HydraideError::AlreadyExists {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::ConditionNotMet`].
    pub fn condition_not_met(key: impl Into<String>, current: Value) -> Self {
        HydraideError::ConditionNotMet {
            key: key.into(),
            current,
        }
    }

    /// Build an [`HydraideError::FailedPrecondition`].
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        HydraideError::FailedPrecondition {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        HydraideError::Timeout {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::Cancelled`].
    pub fn cancelled(message: impl Into<String>) -> Self {
        HydraideError::Cancelled {
            message: message.into(),
        }
    }

    /// Build an [`HydraideError::Transient`] with no underlying source.
    pub fn transient(message: impl Into<String>) -> Self {
        HydraideError::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Build an [`HydraideError::Transient`] wrapping an underlying error.
    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HydraideError::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an [`HydraideError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        HydraideError::Internal {
            message: message.into(),
        }
    }

    /// Is this a "not found" class error (`NotFound` or `SwampNotFound`)?
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HydraideError::NotFound { .. } | HydraideError::SwampNotFound { .. }
        )
    }

    /// May this operation succeed if retried without caller changes
    /// (`Transient`, `Timeout`)?
    pub fn is_retryable(&self) -> bool {
        matches!(self, HydraideError::Transient { .. } | HydraideError::Timeout { .. })
    }

    /// Does this indicate a bug rather than an expected runtime condition?
    pub fn is_serious(&self) -> bool {
        matches!(self, HydraideError::Internal { .. })
    }
}

impl From<std::io::Error> for HydraideError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => HydraideError::NotFound {
                message: e.to_string(),
            },
            std::io::ErrorKind::TimedOut => HydraideError::Timeout {
                message: e.to_string(),
            },
            _ => HydraideError::Transient {
                message: e.to_string(),
                source: Some(Box::new(e)),
            },
        }
    }
}

/// Shown instead of deriving `Display` for `Value` in error contexts where
/// the full payload would be noisy; `ConditionNotMet`'s `{current:?}` uses
/// `Value`'s `Debug` impl directly, this exists for callers formatting a
/// bare kind name.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let e = HydraideError::not_found("k1");
        assert!(e.is_not_found());
        assert!(!e.is_retryable());
        assert!(!e.is_serious());

        let e = HydraideError::swamp_not_found("a/b/c");
        assert!(e.is_not_found());
    }

    #[test]
    fn transient_is_retryable() {
        assert!(HydraideError::transient("disk busy").is_retryable());
        assert!(HydraideError::timeout("deadline exceeded").is_retryable());
        assert!(!HydraideError::invalid_argument("bad").is_retryable());
    }

    #[test]
    fn internal_is_serious() {
        assert!(HydraideError::internal("invariant broken").is_serious());
        assert!(!HydraideError::transient("x").is_serious());
    }

    #[test]
    fn condition_not_met_carries_current_value() {
        let e = HydraideError::condition_not_met("counter", Value::I64(5));
        match e {
            HydraideError::ConditionNotMet { key, current } => {
                assert_eq!(key, "counter");
                assert_eq!(current, Value::I64(5));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn display_messages_contain_context() {
        let e = HydraideError::invalid_argument("key cannot be empty");
        assert!(e.to_string().contains("key cannot be empty"));

        let e = HydraideError::swamp_not_found("acme/chat/sessions");
        assert!(e.to_string().contains("acme/chat/sessions"));
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: HydraideError = io_err.into();
        assert!(e.is_not_found());
    }

    #[test]
    fn io_other_maps_to_transient() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let e: HydraideError = io_err.into();
        assert!(e.is_retryable());
    }
}
