//! Fixed pool of overlay root directory node slots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Arena of node slots with a LIFO free list.
///
/// The most recently freed slot is the next one handed out. Slots only
/// bound how many root nodes are open at once; the node itself is still
/// allocated on the heap by its handle.
#[derive(Debug)]
pub struct NodePool {
    free: Mutex<Vec<usize>>,
    size: usize,
}

impl NodePool {
    pub fn new(size: usize) -> Self {
        Self {
            free: Mutex::new((0..size).rev().collect()),
            size,
        }
    }

    /// Claim a slot, or `None` when every slot is in use.
    pub fn alloc(self: &Arc<Self>) -> Option<NodeSlot> {
        let index = self.lock().pop()?;
        Some(NodeSlot {
            pool: Arc::clone(self),
            index,
        })
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn lock(&self) -> MutexGuard<'_, Vec<usize>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claimed slot; freed when dropped.
#[derive(Debug)]
pub struct NodeSlot {
    pool: Arc<NodePool>,
    index: usize,
}

impl NodeSlot {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for NodeSlot {
    fn drop(&mut self) {
        self.pool.lock().push(self.index);
    }
}
