//! The per-Treasure guard-token protocol: `startGuard` → mutate → `save` →
//! `releaseGuard`, with at most one guard outstanding per Treasure at a
//! time. [`Guard`] auto-releases on drop so a caller that returns early (an
//! error, a panic unwind) never leaves a Treasure stuck locked.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// An opaque handle proving exclusive right to mutate one Treasure.
///
/// Tokens are unique for the process lifetime; a caller holding one must
/// present it to every mutator and to `save`/`releaseGuard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardToken(u64);

impl GuardToken {
    fn next() -> Self {
        GuardToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct GuardState {
    current: Option<GuardToken>,
}

/// A binary mutual-exclusion cell that hands out [`GuardToken`]s instead of
/// lock guards. One `GuardCell` is owned per Treasure.
///
/// All guards are exclusive; the `exclusive` flag on [`GuardCell::start_guard`]
/// is accepted for interface fidelity but this engine has no shared-read
/// guard mode.
#[derive(Debug, Default)]
pub struct GuardCell {
    state: Mutex<GuardState>,
    released: Condvar,
}

/// Returned by a token check against a cell whose current holder does not
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("guard token mismatch")]
pub struct GuardMismatch;

impl GuardCell {
    /// A fresh, unlocked cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until any prior guard is released, then reserve this cell and
    /// return a token-bearing [`Guard`] that releases on drop.
    pub fn start_guard(&self, _exclusive: bool) -> Guard<'_> {
        let mut state = self.state.lock();
        while state.current.is_some() {
            self.released.wait(&mut state);
        }
        let token = GuardToken::next();
        state.current = Some(token);
        drop(state);
        Guard {
            cell: self,
            token,
            released: false,
        }
    }

    /// Verify `token` is the currently outstanding guard, without releasing
    /// it. Used by mutators before applying a change.
    pub fn check(&self, token: GuardToken) -> Result<(), GuardMismatch> {
        if self.state.lock().current == Some(token) {
            Ok(())
        } else {
            Err(GuardMismatch)
        }
    }

    fn release(&self, token: GuardToken) -> Result<(), GuardMismatch> {
        let mut state = self.state.lock();
        if state.current != Some(token) {
            return Err(GuardMismatch);
        }
        state.current = None;
        drop(state);
        self.released.notify_one();
        Ok(())
    }

    /// True if a guard is currently outstanding.
    pub fn is_guarded(&self) -> bool {
        self.state.lock().current.is_some()
    }
}

/// RAII handle returned by [`GuardCell::start_guard`]. Releases the
/// underlying cell on drop if [`Guard::release`] was not called explicitly.
pub struct Guard<'a> {
    cell: &'a GuardCell,
    token: GuardToken,
    released: bool,
}

impl Guard<'_> {
    /// The token to present to mutators and `save`.
    pub fn token(&self) -> GuardToken {
        self.token
    }

    /// Release the guard explicitly, surfacing a mismatch if the cell's
    /// current holder has somehow changed (should not happen under correct
    /// use; indicates a bug).
    pub fn release(mut self) -> Result<(), GuardMismatch> {
        self.released = true;
        self.cell.release(self.token)
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.cell.release(self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn start_guard_returns_distinct_tokens() {
        let cell = GuardCell::new();
        let g1 = cell.start_guard(true);
        let t1 = g1.token();
        g1.release().unwrap();
        let g2 = cell.start_guard(true);
        assert_ne!(t1, g2.token());
    }

    #[test]
    fn check_rejects_wrong_token() {
        let cell = GuardCell::new();
        let g = cell.start_guard(true);
        let wrong = GuardToken::next();
        assert!(cell.check(wrong).is_err());
        assert!(cell.check(g.token()).is_ok());
    }

    #[test]
    fn drop_auto_releases() {
        let cell = GuardCell::new();
        {
            let _g = cell.start_guard(true);
            assert!(cell.is_guarded());
        }
        assert!(!cell.is_guarded());
    }

    #[test]
    fn second_guard_blocks_until_first_released() {
        let cell = Arc::new(GuardCell::new());
        let g1 = cell.start_guard(true);

        let cell2 = cell.clone();
        let handle = thread::spawn(move || {
            let g2 = cell2.start_guard(true);
            g2.release().unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(cell.is_guarded());
        g1.release().unwrap();
        handle.join().unwrap();
        assert!(!cell.is_guarded());
    }
}
