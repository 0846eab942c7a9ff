//! Result type for write paths that need to tell a caller what actually
//! happened, not just that nothing failed.

/// What `set` actually did to a Treasure, returned instead of a bare `()` so
/// a caller can distinguish "I created it", "it already matched and I left
/// it alone", and "it existed and I overwrote it".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The Treasure did not exist and was created.
    Created,
    /// The Treasure already existed and `overwrite` was `false`; the call
    /// was a no-op and the existing value is unchanged.
    NoOp,
    /// The Treasure already existed and `overwrite` was `true`; its value
    /// was replaced.
    Overwritten,
}
