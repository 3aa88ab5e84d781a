//! Overlay driver.
//!
//! Unions named drivers under a single namespace: `/<name>/...` is handed
//! to the driver registered as `<name>` with the rest of the path, and
//! anything else goes to the optional overlaid driver, prefixed with the
//! configured path prefix. The overlay root itself is a synthetic directory
//! listing the registered names followed by the overlaid driver's root.

mod dir_node;
mod node_pool;
mod registry;

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use self::dir_node::OverlayDirNode;
use self::registry::Registry;
use super::driver::VfsDriver;
use crate::buffers::PathBuffer;
use crate::error::{VfsError, VfsResult};
use crate::node::{DirNode, FileNode, OpenFlags};
use crate::path::{self, SEPARATOR};
use crate::vfs::Vfs;

pub use node_pool::{NodePool, NodeSlot};

/// Driver composing registered drivers and an overlaid driver.
///
/// Drivers are registered through `&mut self`, before the overlay is shared.
/// The overlay keeps references to its drivers but does not manage them.
pub struct OverlayDriver {
    vfs: Vfs,
    registry: Registry,
    overlaid: Option<Arc<dyn VfsDriver>>,
    prefix: Option<String>,
    /// Allocated on the first successful `set_cwd` and kept from then on.
    cwd: RwLock<Option<String>>,
}

impl OverlayDriver {
    /// Create an overlay using the resources of `vfs`.
    ///
    /// `prefix`, when given, must be a normalized absolute path. It is put
    /// in front of every path passed to the overlaid driver.
    pub fn new(
        vfs: &Vfs,
        overlaid: Option<Arc<dyn VfsDriver>>,
        prefix: Option<&str>,
    ) -> VfsResult<Self> {
        let config = vfs.config();
        let prefix = prefix
            .map(|p| checked_prefix(p, config.path_max))
            .transpose()?;

        Ok(Self {
            vfs: vfs.clone(),
            registry: Registry::new(config.overlay_drivers_max, config.name_max),
            overlaid,
            prefix,
            cwd: RwLock::new(None),
        })
    }

    /// Register `driver` under `name`.
    ///
    /// Fails with `ResourceExhausted` once the table is full and with
    /// `DriverExists` if the name is taken.
    pub fn register_driver(&mut self, name: &str, driver: Arc<dyn VfsDriver>) -> VfsResult<()> {
        self.registry.register(name, driver)?;
        debug!(name, count = self.registry.len(), "overlay driver registered");
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn driver_names(&self) -> &[String] {
        self.registry.names()
    }

    /// Maximum number of drivers this overlay accepts.
    pub fn driver_capacity(&self) -> usize {
        self.registry.capacity()
    }

    pub fn overlaid(&self) -> Option<&Arc<dyn VfsDriver>> {
        self.overlaid.as_ref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Build the absolute, normalized form of `path` into `buf`.
    fn build_absolute_path(&self, buf: &mut PathBuffer, path: &str) -> VfsResult<()> {
        buf.clear();

        if !path.starts_with(path::is_separator) {
            let cwd = self.cwd.read().map_err(|_| VfsError::LockPoisoned)?;
            buf.append(cwd.as_deref().unwrap_or("/"))?;
        }

        buf.append(path)?;
        buf.normalize()
    }

    /// Open the directory at the absolute path in `path`.
    ///
    /// The path may be rewritten for the overlaid driver. The returned
    /// offset is the length of the prefix put in front of it, so
    /// `&path[offset..]` is the path as seen through the overlay.
    fn open_absolute_dir(&self, path: &mut PathBuffer) -> VfsResult<(DirNode, usize)> {
        path.add_separator()?;

        let mut scan = &path.as_str()[1..];
        if scan.is_empty() {
            return self.open_root().map(|node| (node, 0));
        }

        if let Ok(driver) = self.registry.match_driver(&mut scan) {
            let tail = scan.strip_suffix(SEPARATOR).unwrap_or(scan);
            debug!(path = path.as_str(), tail, "open_dir delegated to registered driver");
            return driver.open_dir(tail).map(|node| (node, 0));
        }

        let Some(overlaid) = &self.overlaid else {
            return Err(VfsError::NotFound(path.as_str().to_string()));
        };

        let offset = match &self.prefix {
            Some(prefix) => path.prepend(prefix)?,
            None => 0,
        };
        debug!(path = path.as_str(), offset, "open_dir passed to overlaid driver");
        let node = overlaid.open_dir(path.as_str())?;
        Ok((node, offset))
    }

    fn open_root(&self) -> VfsResult<DirNode> {
        let slot = self
            .vfs
            .dir_nodes()
            .alloc()
            .ok_or(VfsError::ResourceExhausted("overlay directory nodes"))?;

        // Not having the overlaid root only hides its entries.
        let overlaid_root = self.overlaid.as_ref().and_then(|drv| {
            let root = self.prefix.as_deref().unwrap_or("/");
            match drv.open_dir(root) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(root, error = %e, "overlaid root unavailable");
                    None
                }
            }
        });

        debug!(
            slot = slot.index(),
            overlaid = overlaid_root.is_some(),
            "overlay root node created"
        );
        Ok(DirNode::new(OverlayDirNode::new(
            slot,
            Arc::clone(self.registry.names()),
            overlaid_root,
        )))
    }

    fn open_absolute_file(&self, path: &mut PathBuffer, flags: OpenFlags) -> VfsResult<FileNode> {
        let mut scan = &path.as_str()[1..];
        if scan.is_empty() {
            // The root is never a file.
            return Err(VfsError::NotFound(path.as_str().to_string()));
        }

        if let Ok(driver) = self.registry.match_driver(&mut scan) {
            debug!(path = path.as_str(), tail = scan, "open_file delegated to registered driver");
            return driver.open_file(scan, flags);
        }

        let Some(overlaid) = &self.overlaid else {
            return Err(VfsError::NotFound(path.as_str().to_string()));
        };

        if let Some(prefix) = &self.prefix {
            path.prepend(prefix)?;
        }
        debug!(path = path.as_str(), "open_file passed to overlaid driver");
        overlaid.open_file(path.as_str(), flags)
    }
}

/// Validate a prefix and return it without trailing separator.
fn checked_prefix(prefix: &str, path_max: usize) -> VfsResult<String> {
    let mut normalized = prefix.to_string();
    path::normalize(&mut normalized, path_max)?;
    let canonical = trim_separator(&normalized);

    if canonical != trim_separator(prefix) {
        return Err(VfsError::InvalidPath(prefix.to_string()));
    }
    Ok(canonical.to_string())
}

fn trim_separator(path: &str) -> &str {
    match path.strip_suffix(SEPARATOR) {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

impl VfsDriver for OverlayDriver {
    fn set_cwd(&self, path: &str) -> VfsResult<()> {
        let mut buf = self.vfs.buffers().take();

        self.build_absolute_path(&mut buf, path)?;

        // Probe only; the path in `buf` may have been rewritten.
        let (node, offset) = self.open_absolute_dir(&mut buf)?;
        node.release();

        let validated = trim_separator(&buf.as_str()[offset..]);
        let mut cwd = self.cwd.write().map_err(|_| VfsError::LockPoisoned)?;
        if cwd.is_none() {
            let mut storage = String::new();
            storage
                .try_reserve_exact(self.vfs.config().path_max)
                .map_err(|_| VfsError::OutOfMemory)?;
            *cwd = Some(storage);
        }
        if let Some(stored) = cwd.as_mut() {
            stored.clear();
            stored.push_str(validated);
            debug!(cwd = stored.as_str(), "overlay cwd changed");
        }
        Ok(())
    }

    fn get_cwd(&self, buf: &mut String, size: usize) -> VfsResult<()> {
        let cwd = self.cwd.read().map_err(|_| VfsError::LockPoisoned)?;
        buf.clear();
        path::append(buf, cwd.as_deref().unwrap_or("/"), size)
    }

    fn open_dir(&self, path: &str) -> VfsResult<DirNode> {
        let mut buf = self.vfs.buffers().take();

        self.build_absolute_path(&mut buf, path)?;
        let (node, _) = self.open_absolute_dir(&mut buf)?;
        Ok(node)
    }

    fn open_file(&self, path: &str, flags: OpenFlags) -> VfsResult<FileNode> {
        let mut buf = self.vfs.buffers().take();

        self.build_absolute_path(&mut buf, path)?;
        self.open_absolute_file(&mut buf, flags)
    }
}
