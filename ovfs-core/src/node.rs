//! Directory and file nodes handed out by drivers.
//!
//! Nodes are reached through [`NodeHandle`], an owning, reference-counted
//! handle. Duplicating a handle adds a reference, releasing (or dropping)
//! one removes it, and the node itself is dropped when the last reference
//! goes away. Node types put their cleanup in `Drop`, which therefore runs
//! exactly once per node.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use bitflags::bitflags;

use crate::error::{VfsError, VfsResult};

bitflags! {
    /// Node attributes reported in directory entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeAttr: u32 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const DIR = 0x10;
        const ARCHIVE = 0x20;
    }
}

bitflags! {
    /// Flags passed to `open_file`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
        const CREATE = 0x04;
        const TRUNCATE = 0x08;
        const APPEND = 0x10;
        const EXCLUSIVE = 0x20;
    }
}

/// One entry produced by directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub attr: NodeAttr,
    pub size: u64,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.attr.contains(NodeAttr::DIR)
    }

    pub fn is_read_only(&self) -> bool {
        self.attr.contains(NodeAttr::READ_ONLY)
    }
}

/// Directory enumeration.
///
/// `Ok(None)` means there are no more entries.
pub trait DirectoryNode: Send {
    /// Restart the enumeration and return the first entry.
    fn first(&mut self) -> VfsResult<Option<DirEntry>>;

    /// Return the entry after the last one produced.
    fn next(&mut self) -> VfsResult<Option<DirEntry>>;
}

/// An opened file.
pub trait FileObject: Send {
    /// Name and attributes of the file.
    fn info(&self) -> DirEntry;

    /// Flags the file was opened with.
    fn flags(&self) -> OpenFlags;
}

/// Owning, reference-counted handle to a node.
pub struct NodeHandle<T: ?Sized> {
    node: Arc<Mutex<T>>,
}

/// Handle to a directory node.
pub type DirNode = NodeHandle<dyn DirectoryNode>;

/// Handle to a file node.
pub type FileNode = NodeHandle<dyn FileObject>;

impl<T: ?Sized> NodeHandle<T> {
    /// Take another reference to the same node.
    pub fn duplicate(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }

    /// Drop this reference. The node goes away with its last reference.
    pub fn release(self) {}

    /// Number of live references to the node.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }

    fn lock(&self) -> VfsResult<MutexGuard<'_, T>> {
        self.node.lock().map_err(|_| VfsError::LockPoisoned)
    }
}

impl<T: ?Sized> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl<T: ?Sized> fmt::Debug for NodeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl DirNode {
    pub fn new<N: DirectoryNode + 'static>(node: N) -> Self {
        Self {
            node: Arc::new(Mutex::new(node)),
        }
    }

    pub fn first(&self) -> VfsResult<Option<DirEntry>> {
        self.lock()?.first()
    }

    pub fn next(&self) -> VfsResult<Option<DirEntry>> {
        self.lock()?.next()
    }

    /// Enumerate the whole directory from the start.
    pub fn entries(&self) -> VfsResult<Vec<DirEntry>> {
        let mut node = self.lock()?;
        let mut entries = Vec::new();
        let mut entry = node.first()?;
        while let Some(e) = entry {
            entries.push(e);
            entry = node.next()?;
        }
        Ok(entries)
    }
}

impl FileNode {
    pub fn new<N: FileObject + 'static>(node: N) -> Self {
        Self {
            node: Arc::new(Mutex::new(node)),
        }
    }

    pub fn info(&self) -> VfsResult<DirEntry> {
        Ok(self.lock()?.info())
    }

    pub fn flags(&self) -> VfsResult<OpenFlags> {
        Ok(self.lock()?.flags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        items: Vec<&'static str>,
        index: usize,
        drops: Arc<AtomicUsize>,
    }

    impl DirectoryNode for Counting {
        fn first(&mut self) -> VfsResult<Option<DirEntry>> {
            self.index = 0;
            self.next()
        }

        fn next(&mut self) -> VfsResult<Option<DirEntry>> {
            let Some(name) = self.items.get(self.index) else {
                return Ok(None);
            };
            self.index += 1;
            Ok(Some(DirEntry {
                name: name.to_string(),
                attr: NodeAttr::empty(),
                size: 0,
            }))
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(items: Vec<&'static str>) -> (DirNode, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let node = DirNode::new(Counting {
            items,
            index: 0,
            drops: Arc::clone(&drops),
        });
        (node, drops)
    }

    #[test]
    fn test_release_runs_cleanup_once() {
        let (node, drops) = counting(vec![]);
        assert_eq!(node.ref_count(), 1);

        let dup = node.duplicate();
        assert_eq!(node.ref_count(), 2);

        node.release();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(dup.ref_count(), 1);

        dup.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicates_share_cursor() {
        let (node, _drops) = counting(vec!["a", "b"]);
        let dup = node.clone();

        assert_eq!(node.first().unwrap().unwrap().name, "a");
        assert_eq!(dup.next().unwrap().unwrap().name, "b");
        assert!(node.next().unwrap().is_none());
    }

    #[test]
    fn test_entries_restarts() {
        let (node, _drops) = counting(vec!["a", "b", "c"]);
        node.first().unwrap();
        let names: Vec<String> = node.entries().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_entry_attrs() {
        let entry = DirEntry {
            name: "flash".to_string(),
            attr: NodeAttr::DIR | NodeAttr::READ_ONLY,
            size: 0,
        };
        assert!(entry.is_dir());
        assert!(entry.is_read_only());
    }
}
