//! Version-guarded state cells and the worker-side snapshot pattern.
//!
//! Each independently mutable state group lives in a [`Versioned`] cell: the
//! API thread mutates the payload under the write lock and then bumps the
//! version; workers keep a [`Snapshot`] per group and re-copy the payload only
//! when the published version differs from the one they last observed. A
//! reader that races a writer keeps its previous copy for one extra round,
//! which the pipeline tolerates, and picks up the new data on the next check.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard};

/// A state group guarded by an atomic version counter.
#[derive(Debug, Default)]
pub struct Versioned<T> {
    version: AtomicU32,
    data: RwLock<T>,
}

impl<T> Versioned<T> {
    pub fn new(value: T) -> Self {
        Self {
            version: AtomicU32::new(0),
            data: RwLock::new(value),
        }
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.data.read().unwrap()
    }

    /// Mutates the payload and publishes a new version. Returns the closure's
    /// result so callers can validate while holding the write lock.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.data.write().unwrap();
            f(&mut guard)
        };
        self.version.fetch_add(1, Ordering::Release);
        result
    }

    /// Like [`modify`](Versioned::modify) but only publishes a new version
    /// when the closure succeeds; a failed mutation must leave the payload
    /// untouched.
    pub fn try_modify<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let result = {
            let mut guard = self.data.write().unwrap();
            f(&mut guard)
        };
        if result.is_ok() {
            self.version.fetch_add(1, Ordering::Release);
        }
        result
    }

    pub fn replace(&self, value: T) {
        self.modify(|data| *data = value);
    }
}

impl<T: Clone> Versioned<T> {
    pub fn get(&self) -> T {
        self.read().clone()
    }
}

/// A worker-local cache of one [`Versioned`] group.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    cached: Option<(u32, T)>,
}

impl<T: Clone> Snapshot<T> {
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Returns the cached copy, refreshing it first if the source has
    /// published a newer version.
    pub fn refresh<'a>(&'a mut self, source: &Versioned<T>) -> &'a T {
        let version = source.version();
        let stale = match &self.cached {
            Some((seen, _)) => *seen != version,
            None => true,
        };
        if stale {
            self.cached = Some((version, source.read().clone()));
        }
        &self.cached.as_ref().unwrap().1
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// A capability flag with its own version counter.
///
/// Flags are read directly by workers (no snapshot needed); the counter exists
/// so toggles are observable like any other state-group mutation.
#[derive(Debug, Default)]
pub struct VersionedFlag {
    value: AtomicBool,
    version: AtomicU32,
}

impl VersionedFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
            version: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
        self.version.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_publishes_a_new_version() {
        let cell = Versioned::new(7u32);
        assert_eq!(cell.version(), 0);
        cell.modify(|v| *v = 8);
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.get(), 8);
    }

    #[test]
    fn snapshot_copies_only_on_version_change() {
        let cell = Versioned::new(vec![1, 2, 3]);
        let mut snapshot = Snapshot::new();
        assert_eq!(snapshot.refresh(&cell), &[1, 2, 3]);

        // Unversioned reads keep the cached copy.
        assert_eq!(snapshot.refresh(&cell), &[1, 2, 3]);

        cell.modify(|v| v.push(4));
        assert_eq!(snapshot.refresh(&cell), &[1, 2, 3, 4]);
    }

    #[test]
    fn toggling_a_flag_advances_its_version_by_two() {
        let flag = VersionedFlag::new(false);
        let before = flag.version();
        flag.set(true);
        flag.set(false);
        assert!(!flag.get());
        assert_eq!(flag.version(), before + 2);
    }

    #[test]
    fn concurrent_readers_always_observe_a_complete_copy() {
        use std::sync::Arc;

        let cell = Arc::new(Versioned::new([0u64; 8]));
        let writer_cell = cell.clone();
        let writer = std::thread::spawn(move || {
            for i in 1..500u64 {
                writer_cell.modify(|data| *data = [i; 8]);
            }
        });

        let mut snapshot = Snapshot::new();
        for _ in 0..500 {
            let copy = snapshot.refresh(&cell);
            let first = copy[0];
            assert!(copy.iter().all(|&v| v == first), "torn snapshot: {copy:?}");
        }
        writer.join().unwrap();
    }
}
