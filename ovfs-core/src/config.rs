//! VFS sizing configuration.
//!
//! All tables and pools are sized from here once, when a [`crate::Vfs`] is
//! created, and never grow afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};

/// Sizes of the fixed VFS resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VfsConfig {
    /// Maximum length of a path, in bytes.
    pub path_max: usize,
    /// Maximum length of a single path component.
    pub name_max: usize,
    /// Number of shared path buffers.
    pub path_buffers: usize,
    /// Maximum number of drivers registered in one overlay.
    pub overlay_drivers_max: usize,
    /// Number of overlay root directory nodes that can be open at once.
    pub overlay_dir_nodes: usize,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            path_max: 1024,
            name_max: 12,
            path_buffers: 4,
            overlay_drivers_max: 4,
            overlay_dir_nodes: 8,
        }
    }
}

impl VfsConfig {
    /// Check that every size is usable.
    pub fn validate(&self) -> VfsResult<()> {
        let zero = [
            ("pathMax", self.path_max),
            ("nameMax", self.name_max),
            ("pathBuffers", self.path_buffers),
            ("overlayDriversMax", self.overlay_drivers_max),
            ("overlayDirNodes", self.overlay_dir_nodes),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);

        if let Some((field, _)) = zero {
            return Err(VfsError::InvalidConfig(format!("{} must not be zero", field)));
        }
        if self.name_max > self.path_max {
            return Err(VfsError::InvalidConfig(
                "nameMax must not exceed pathMax".to_string(),
            ));
        }
        Ok(())
    }
}
