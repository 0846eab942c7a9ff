//! A lazily-populated, process-wide table of per-path mutexes.
//!
//! Used by the chunked file store so unrelated Swamps never contend on a
//! lock, while conflicting operations on the same file or folder are
//! serialized. Insert-or-get is a single `DashMap` entry operation (itself
//! internally striped), then the per-path mutex is held independently of
//! the table.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Table of `path -> mutex`, grown on demand and never shrunk.
///
/// Entries are cheap (`Arc<Mutex<()>>`) and are not reclaimed when a path's
/// file is deleted; a long-lived process accumulates one entry per distinct
/// path ever touched. Acceptable for the expected namespace sizes; revisit
/// with an eviction policy if per-path churn becomes unbounded.
#[derive(Debug, Default)]
pub struct PathLockTable {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLockTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the mutex guarding `path`.
    pub fn get_or_create(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of distinct paths this table has ever locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True if no path has ever been locked through this table.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use std::thread;

    #[test]
    fn same_path_yields_same_mutex() {
        let table = PathLockTable::new();
        let a = table.get_or_create(Path::new("/swamps/a"));
        let b = table.get_or_create(Path::new("/swamps/a"));
        assert!(StdArc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn different_paths_yield_different_mutexes() {
        let table = PathLockTable::new();
        let a = table.get_or_create(Path::new("/swamps/a"));
        let b = table.get_or_create(Path::new("/swamps/b"));
        assert!(!StdArc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn concurrent_same_path_access_is_serialized() {
        let table = StdArc::new(PathLockTable::new());
        let counter = StdArc::new(Mutex::new(0_u32));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let lock = table.get_or_create(Path::new("/shared"));
                let _guard = lock.lock();
                let mut c = counter.lock();
                *c += 1;
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*counter.lock(), 8);
    }
}
