//! Per-entry memoization used by layers and file stores.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::Error;

/// A value that is computed at most once, on first access.
///
/// Every slot has its own guard, so first accesses of different slots never
/// wait on each other. Concurrent first accesses of the same slot block until
/// one of them has run the loader, then all observe the same outcome: the
/// same [`Arc`], or a clone of the same error. A failure is not cached; an
/// access that starts after it has been reported runs the loader again.
pub struct LazySlot<T, E = Error> {
    value: OnceLock<Arc<T>>,
    /// The most recent failure, for callers that were waiting on it.
    init: Mutex<Option<E>>,
    failures: AtomicUsize,
}

impl<T, E> LazySlot<T, E> {
    pub fn new() -> Self {
        LazySlot {
            value: OnceLock::new(),
            init: Mutex::new(None),
            failures: AtomicUsize::new(0),
        }
    }

    /// A slot that is already populated.
    pub fn loaded(value: Arc<T>) -> Self {
        LazySlot {
            value: OnceLock::from(value),
            init: Mutex::new(None),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.value.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn get_or_try_init(&self, load: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E>
    where
        E: Clone,
    {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        let failures_seen = self.failures.load(Ordering::Acquire);
        let mut last_failure = self.init.lock();
        // someone else may have finished while we waited
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        if self.failures.load(Ordering::Acquire) != failures_seen {
            if let Some(err) = last_failure.as_ref() {
                return Err(err.clone());
            }
        }
        match load() {
            Ok(value) => {
                let value = Arc::new(value);
                *last_failure = None;
                // only writer while the guard is held, so this can't already be set
                let _ = self.value.set(value.clone());
                Ok(value)
            }
            Err(err) => {
                *last_failure = Some(err.clone());
                self.failures.fetch_add(1, Ordering::Release);
                Err(err)
            }
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut Arc<T>> {
        self.value.get_mut()
    }

    /// Exclusive access, loading first if needed. No locking: `&mut self`
    /// already rules out other readers.
    pub fn get_mut_or_try_init(
        &mut self,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<&mut Arc<T>, E> {
        if self.value.get().is_none() {
            self.value = OnceLock::from(Arc::new(load()?));
        }
        Ok(self.value.get_mut().expect("slot was just filled"))
    }

    pub fn set(&mut self, value: Arc<T>) {
        self.value = OnceLock::from(value);
    }

    pub fn take(&mut self) -> Option<Arc<T>> {
        self.value.take()
    }
}

impl<T, E> Default for LazySlot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug, E> Debug for LazySlot<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("LazySlot").field(value).finish(),
            None => f.write_str("LazySlot(<not loaded>)"),
        }
    }
}

/// Counts of files actually read, shared by everything opened from one package.
#[derive(Debug, Default)]
pub struct LoadStats {
    glyph_files: AtomicUsize,
    layer_info_files: AtomicUsize,
    data_files: AtomicUsize,
    image_files: AtomicUsize,
}

impl LoadStats {
    pub(crate) fn glyph_read(&self) {
        self.glyph_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn layer_info_read(&self) {
        self.layer_info_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn data_read(&self) {
        self.data_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn image_read(&self) {
        self.image_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn glyph_files_read(&self) -> usize {
        self.glyph_files.load(Ordering::Relaxed)
    }

    pub fn layer_info_files_read(&self) -> usize {
        self.layer_info_files.load(Ordering::Relaxed)
    }

    pub fn data_files_read(&self) -> usize {
        self.data_files.load(Ordering::Relaxed)
    }

    pub fn image_files_read(&self) -> usize {
        self.image_files.load(Ordering::Relaxed)
    }
}
