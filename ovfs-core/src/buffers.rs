//! Shared path buffers.
//!
//! A fixed set of path buffers is created up front. Callers that need to
//! build or rewrite a path take one, waiting for as long as it takes when
//! all of them are in use, and hand it back when done. Running out of
//! buffers means the pool is undersized for the worst-case nesting and
//! concurrency of the system, so `take()` has no failure or timeout path.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::VfsResult;
use crate::path;

/// Fixed-capacity path string.
///
/// The capacity is set when the pool is built; every mutator is bounded by
/// it and fails with `PathTooLong` rather than growing the buffer. One byte
/// past the capacity is reserved for the separator added to a directory
/// path and for the join with a prepended prefix, so a path of exactly
/// `capacity` bytes can still be opened as a directory.
#[derive(Debug)]
pub struct PathBuffer {
    path: String,
    capacity: usize,
}

impl PathBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            path: String::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Maximum length of the path this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.path.clear();
    }

    pub fn append(&mut self, s: &str) -> VfsResult<()> {
        path::append(&mut self.path, s, self.capacity)
    }

    /// Prefix the path, returning how many bytes were inserted.
    pub fn prepend(&mut self, prefix: &str) -> VfsResult<usize> {
        path::prepend(&mut self.path, prefix, self.capacity + 1)
    }

    pub fn add_separator(&mut self) -> VfsResult<()> {
        path::add_separator(&mut self.path, self.capacity + 1)
    }

    pub fn normalize(&mut self) -> VfsResult<()> {
        path::normalize(&mut self.path, self.capacity)
    }
}

impl AsRef<str> for PathBuffer {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

/// Pool of preallocated path buffers with blocking acquisition.
#[derive(Debug)]
pub struct PathBufferPool {
    free: Mutex<Vec<PathBuffer>>,
    released: Condvar,
    capacity: usize,
    count: usize,
}

impl PathBufferPool {
    /// Preload the pool with `count` buffers of `capacity` bytes each.
    pub fn new(capacity: usize, count: usize) -> Self {
        let free = (0..count).map(|_| PathBuffer::new(capacity)).collect();
        Self {
            free: Mutex::new(free),
            released: Condvar::new(),
            capacity,
            count,
        }
    }

    /// Claim a buffer, waiting until one is available.
    ///
    /// The buffer comes back empty and returns to the pool when the guard
    /// is dropped or released.
    pub fn take(&self) -> PooledPath<'_> {
        let mut free = self.lock();
        let mut buf = loop {
            if let Some(buf) = free.pop() {
                break buf;
            }
            free = self
                .released
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        };
        drop(free);

        buf.clear();
        trace!(available = self.available(), "path buffer taken");
        PooledPath {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of buffers currently not checked out.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// Total number of buffers owned by the pool.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Capacity of each buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn give_back(&self, buf: PathBuffer) {
        self.lock().push(buf);
        self.released.notify_one();
        trace!("path buffer released");
    }

    // The free list stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Vec<PathBuffer>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A path buffer checked out of a [`PathBufferPool`].
#[derive(Debug)]
pub struct PooledPath<'a> {
    pool: &'a PathBufferPool,
    buf: Option<PathBuffer>,
}

impl PooledPath<'_> {
    /// Return the buffer to its pool.
    pub fn release(self) {}
}

// `buf` is only emptied in drop.
impl Deref for PooledPath<'_> {
    type Target = PathBuffer;

    fn deref(&self) -> &PathBuffer {
        match &self.buf {
            Some(buf) => buf,
            None => unreachable!("path buffer used after release"),
        }
    }
}

impl DerefMut for PooledPath<'_> {
    fn deref_mut(&mut self) -> &mut PathBuffer {
        match &mut self.buf {
            Some(buf) => buf,
            None => unreachable!("path buffer used after release"),
        }
    }
}

impl Drop for PooledPath<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.give_back(buf);
        }
    }
}
