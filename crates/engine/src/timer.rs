//! A cancellable, rearmable deadline primitive driven by a condvar rather
//! than a busy-wait poll. The idle-close and flush-interval loops in
//! [`crate::swamp::Swamp`] each run on a dedicated background thread that
//! calls [`Timer::wait`] in a loop.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TimerState {
    deadline: Option<Instant>,
    stopped: bool,
}

/// Outcome of one [`Timer::wait`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The armed deadline elapsed without being rearmed or cancelled.
    Fired,
    /// [`Timer::stop`] was called; the timer will never fire again.
    Stopped,
}

/// A single rearmable/cancellable deadline, shared between whoever arms it
/// and the thread that waits on it.
#[derive(Debug, Default)]
pub struct Timer {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            deadline: None,
            stopped: false,
        }
    }
}

impl Timer {
    /// An unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or rearm) the timer to fire `after` from now, replacing any
    /// previously armed deadline.
    pub fn arm(&self, after: Duration) {
        let mut state = self.state.lock();
        state.deadline = Some(Instant::now() + after);
        self.changed.notify_all();
    }

    /// Cancel any armed deadline without stopping the timer for future use.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.deadline = None;
        self.changed.notify_all();
    }

    /// Permanently stop the timer; any waiter returns `Stopped` and future
    /// `arm` calls are ignored.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.deadline = None;
        self.changed.notify_all();
    }

    /// Block until the armed deadline elapses or the timer is stopped. If
    /// no deadline is armed, blocks until one is armed or the timer stops.
    /// A rearm observed while waiting simply restarts the wait against the
    /// new deadline.
    pub fn wait(&self) -> TimerOutcome {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return TimerOutcome::Stopped;
            }
            match state.deadline {
                None => {
                    self.changed.wait(&mut state);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        state.deadline = None;
                        return TimerOutcome::Fired;
                    }
                    self.changed.wait_for(&mut state, deadline - now);
                }
            }
        }
    }
}
