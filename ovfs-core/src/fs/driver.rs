//! VfsDriver trait - the contract every driver in the VFS implements.

use crate::error::VfsResult;
use crate::node::{DirNode, FileNode, OpenFlags};

/// Filesystem driver interface.
///
/// Paths may be absolute or relative to the driver's current working
/// directory. Drivers are composed as `Arc<dyn VfsDriver>`; a driver that
/// delegates to another never owns it.
pub trait VfsDriver: Send + Sync {
    /// Change the current working directory. The path must name an
    /// existing directory.
    fn set_cwd(&self, path: &str) -> VfsResult<()>;

    /// Copy the current working directory into `buf`.
    /// Fails with `PathTooLong` if it is longer than `size`.
    fn get_cwd(&self, buf: &mut String, size: usize) -> VfsResult<()>;

    /// Open a directory for enumeration.
    fn open_dir(&self, path: &str) -> VfsResult<DirNode>;

    /// Open a file.
    fn open_file(&self, path: &str, flags: OpenFlags) -> VfsResult<FileNode>;
}
