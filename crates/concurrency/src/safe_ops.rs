//! Process-wide safe-shutdown coordination: an in-flight operation counter
//! a graceful-stop sequence can drain, plus a single-subscriber panic
//! fanout used by the supervisor's panic watcher.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc;

/// Process-wide in-flight operation counter and panic signal.
///
/// One instance is owned by the supervisor and shared (by reference or
/// `Arc`) with every component that performs a mutating operation.
#[derive(Debug)]
pub struct SafeOps {
    in_flight: AtomicI64,
    quiescent: Mutex<()>,
    drained: Condvar,
    panic_tx: mpsc::Sender<PanicSignal>,
    panic_rx: Mutex<Option<mpsc::Receiver<PanicSignal>>>,
}

/// Sent once per `trigger_panic` call; carries no payload beyond its
/// occurrence.
#[derive(Debug, Clone, Copy)]
pub struct PanicSignal;

impl Default for SafeOps {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeOps {
    /// A fresh coordinator with a zeroed counter and an unclaimed panic
    /// channel.
    pub fn new() -> Self {
        let (panic_tx, panic_rx) = mpsc::channel();
        Self {
            in_flight: AtomicI64::new(0),
            quiescent: Mutex::new(()),
            drained: Condvar::new(),
            panic_tx,
            panic_rx: Mutex::new(Some(panic_rx)),
        }
    }

    /// Mark one operation as in-flight. Pair with [`SafeOps::unlock_system`],
    /// or use [`SafeOps::enter`] for an RAII-scoped version.
    pub fn lock_system(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark one in-flight operation as finished. Wakes any
    /// [`SafeOps::wait_for_unlock`] callers once the counter reaches zero.
    pub fn unlock_system(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "unlock_system called more often than lock_system");
        if previous == 1 {
            let _guard = self.quiescent.lock();
            self.drained.notify_all();
        }
    }

    /// True while at least one operation is in flight.
    pub fn system_locked(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Block the calling thread until the in-flight counter reaches zero.
    pub fn wait_for_unlock(&self) {
        let mut guard = self.quiescent.lock();
        while self.system_locked() {
            self.drained.wait(&mut guard);
        }
    }

    /// Scoped in-flight marker: calls `lock_system` now, `unlock_system` on
    /// drop. Use this instead of raw `lock_system`/`unlock_system` pairs so
    /// an early return or panic unwind still releases the count.
    pub fn enter(&self) -> InFlightGuard<'_> {
        self.lock_system();
        InFlightGuard { ops: self }
    }

    /// Claim the panic receiver. Only the first caller per process receives
    /// `Some`; later callers get `None`.
    pub fn monitor_panic(&self) -> Option<mpsc::Receiver<PanicSignal>> {
        self.panic_rx.lock().take()
    }

    /// Send one panic signal to whoever holds the receiver, if anyone does.
    pub fn trigger_panic(&self) {
        let _ = self.panic_tx.send(PanicSignal);
    }
}

/// RAII in-flight marker returned by [`SafeOps::enter`].
pub struct InFlightGuard<'a> {
    ops: &'a SafeOps,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.ops.unlock_system();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_unlocked() {
        let ops = SafeOps::new();
        assert!(!ops.system_locked());
    }

    #[test]
    fn lock_unlock_roundtrip() {
        let ops = SafeOps::new();
        ops.lock_system();
        assert!(ops.system_locked());
        ops.unlock_system();
        assert!(!ops.system_locked());
    }

    #[test]
    fn enter_guard_releases_on_drop() {
        let ops = SafeOps::new();
        {
            let _guard = ops.enter();
            assert!(ops.system_locked());
        }
        assert!(!ops.system_locked());
    }

    #[test]
    fn wait_for_unlock_returns_once_drained() {
        let ops = Arc::new(SafeOps::new());
        let guard = ops.enter();

        let waiter_ops = ops.clone();
        let waiter = thread::spawn(move || {
            waiter_ops.wait_for_unlock();
        });

        thread::sleep(Duration::from_millis(50));
        drop(guard);
        waiter.join().unwrap();
        assert!(!ops.system_locked());
    }

    #[test]
    fn monitor_panic_is_single_subscriber() {
        let ops = SafeOps::new();
        let first = ops.monitor_panic();
        assert!(first.is_some());
        let second = ops.monitor_panic();
        assert!(second.is_none());

        ops.trigger_panic();
        let signal = first.unwrap().recv_timeout(Duration::from_secs(1));
        assert!(signal.is_ok());
    }
}
