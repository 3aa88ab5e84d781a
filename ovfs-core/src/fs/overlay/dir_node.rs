//! Overlay root directory node.

use std::sync::Arc;

use tracing::trace;

use super::node_pool::NodeSlot;
use crate::error::VfsResult;
use crate::node::{DirEntry, DirNode, DirectoryNode, NodeAttr};

/// Enumerates the overlay root: one read-only directory entry per
/// registered driver, in registration order, then the entries of the
/// overlaid driver's root if it could be opened.
///
/// Fields drop in declaration order: the overlaid root is released before
/// the slot goes back to the pool.
pub(crate) struct OverlayDirNode {
    overlaid_root: Option<DirNode>,
    names: Arc<Vec<String>>,
    /// Position in the enumeration. `names.len()` is the hand-over point
    /// to the overlaid root, anything past it means the overlaid root is
    /// being enumerated.
    index: usize,
    slot: NodeSlot,
}

impl OverlayDirNode {
    pub(crate) fn new(slot: NodeSlot, names: Arc<Vec<String>>, overlaid_root: Option<DirNode>) -> Self {
        Self {
            overlaid_root,
            names,
            index: 0,
            slot,
        }
    }
}

impl DirectoryNode for OverlayDirNode {
    fn first(&mut self) -> VfsResult<Option<DirEntry>> {
        self.index = 0;
        self.next()
    }

    fn next(&mut self) -> VfsResult<Option<DirEntry>> {
        let count = self.names.len();

        if let Some(name) = self.names.get(self.index) {
            self.index += 1;
            return Ok(Some(DirEntry {
                name: name.clone(),
                attr: NodeAttr::DIR | NodeAttr::READ_ONLY,
                size: 0,
            }));
        }

        if let Some(root) = &self.overlaid_root {
            if self.index == count {
                trace!(slot = self.slot.index(), "continuing into overlaid root");
                self.index += 1;
                return root.first();
            }
            return root.next();
        }

        Ok(None)
    }
}

impl Drop for OverlayDirNode {
    fn drop(&mut self) {
        // The overlaid root handle, then the pool slot, go with the fields.
        trace!(slot = self.slot.index(), "overlay root node released");
    }
}
