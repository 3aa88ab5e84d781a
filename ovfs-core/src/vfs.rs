//! Shared VFS resources.
//!
//! A `Vfs` owns everything the drivers built from it share:
//! - The sizing configuration
//! - The path buffer pool
//! - The pool of overlay root directory nodes
//!
//! It is passed explicitly to whoever needs it; clones are cheap and all
//! refer to the same resources.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::buffers::PathBufferPool;
use crate::config::VfsConfig;
use crate::error::VfsResult;
use crate::fs::overlay::NodePool;
use crate::fs::{OverlayDriver, VfsDriver};

struct VfsInner {
    config: VfsConfig,
    buffers: PathBufferPool,
    dir_nodes: Arc<NodePool>,
}

/// Handle to a set of VFS resources.
#[derive(Clone)]
pub struct Vfs {
    inner: Arc<VfsInner>,
}

impl Vfs {
    /// Allocate every pool described by `config`.
    pub fn new(config: VfsConfig) -> VfsResult<Self> {
        config.validate()?;

        let buffers = PathBufferPool::new(config.path_max, config.path_buffers);
        let dir_nodes = Arc::new(NodePool::new(config.overlay_dir_nodes));
        debug!(?config, "vfs resources allocated");

        Ok(Self {
            inner: Arc::new(VfsInner {
                config,
                buffers,
                dir_nodes,
            }),
        })
    }

    pub fn config(&self) -> &VfsConfig {
        &self.inner.config
    }

    /// Path buffers shared by every path-manipulating call.
    pub fn buffers(&self) -> &PathBufferPool {
        &self.inner.buffers
    }

    /// Slots for overlay root directory nodes.
    pub fn dir_nodes(&self) -> &Arc<NodePool> {
        &self.inner.dir_nodes
    }

    /// Create an overlay driver bound to these resources.
    pub fn overlay(
        &self,
        overlaid: Option<Arc<dyn VfsDriver>>,
        prefix: Option<&str>,
    ) -> VfsResult<OverlayDriver> {
        OverlayDriver::new(self, overlaid, prefix)
    }
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("config", &self.inner.config)
            .field("free_buffers", &self.inner.buffers.available())
            .field("free_dir_nodes", &self.inner.dir_nodes.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VfsError;

    #[test]
    fn test_pools_sized_from_config() {
        let vfs = Vfs::new(VfsConfig {
            path_max: 64,
            path_buffers: 3,
            overlay_dir_nodes: 5,
            ..VfsConfig::default()
        })
        .unwrap();

        assert_eq!(vfs.buffers().count(), 3);
        assert_eq!(vfs.buffers().capacity(), 64);
        assert_eq!(vfs.dir_nodes().size(), 5);
    }

    #[test]
    fn test_clones_share_resources() {
        let vfs1 = Vfs::new(VfsConfig::default()).unwrap();
        let vfs2 = vfs1.clone(); // Cheap clone (Arc)

        let buf = vfs1.buffers().take();
        assert_eq!(vfs2.buffers().available(), vfs2.buffers().count() - 1);
        drop(buf);

        let a = vfs1.overlay(None, None).unwrap();
        let b = vfs2.overlay(None, None).unwrap();
        let na = a.open_dir("/").unwrap();
        let nb = b.open_dir("/").unwrap();
        assert_eq!(vfs1.dir_nodes().available(), vfs1.dir_nodes().size() - 2);
        drop((na, nb));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VfsConfig {
            path_buffers: 0,
            ..VfsConfig::default()
        };
        assert!(matches!(Vfs::new(config), Err(VfsError::InvalidConfig(_))));
    }
}
