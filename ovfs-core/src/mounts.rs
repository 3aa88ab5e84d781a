//! Mount descriptions.
//!
//! A mount description is a JSON document describing an overlay namespace:
//! the VFS limits, the registered drivers and an optional overlaid driver
//! with its path prefix. Drivers described here are memory drivers.
//!
//! ```json
//! {
//!   "limits": { "pathBuffers": 4 },
//!   "prefix": "/data",
//!   "fallback": { "files": { "/data/logs/today.txt": "hello" } },
//!   "drivers": [ { "name": "flash", "tree": { "dirs": ["boot"] } } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::VfsConfig;
use crate::error::VfsResult;
use crate::fs::{MemoryDriver, OverlayDriver, VfsDriver};
use crate::vfs::Vfs;

/// Contents of a memory driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTree {
    #[serde(default)]
    pub dirs: Vec<String>,
    /// File path to file contents.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl MemoryTree {
    pub fn build(&self, path_max: usize) -> VfsResult<MemoryDriver> {
        let mut drv = MemoryDriver::with_path_max(path_max);
        for dir in &self.dirs {
            drv.add_dir(dir)?;
        }
        for (path, content) in &self.files {
            drv.add_file_str(path, content)?;
        }
        Ok(drv)
    }
}

/// A driver registered in the overlay under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverMount {
    pub name: String,
    #[serde(default)]
    pub tree: MemoryTree,
}

/// Mount description schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    #[serde(default)]
    pub limits: VfsConfig,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub fallback: Option<MemoryTree>,
    #[serde(default)]
    pub drivers: Vec<DriverMount>,
}

/// A built namespace: the shared resources and the overlay on top.
#[derive(Clone)]
pub struct Mounted {
    pub vfs: Vfs,
    pub root: Arc<OverlayDriver>,
}

impl MountConfig {
    pub fn from_json_str(text: &str) -> VfsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Create the resources and the overlay, registering every driver.
    pub fn build(&self) -> VfsResult<Mounted> {
        let vfs = Vfs::new(self.limits.clone())?;
        let path_max = vfs.config().path_max;

        let fallback = match &self.fallback {
            Some(tree) => Some(Arc::new(tree.build(path_max)?) as Arc<dyn VfsDriver>),
            None => None,
        };

        let mut overlay = vfs.overlay(fallback, self.prefix.as_deref())?;
        for mount in &self.drivers {
            overlay.register_driver(&mount.name, Arc::new(mount.tree.build(path_max)?))?;
        }

        Ok(Mounted {
            vfs,
            root: Arc::new(overlay),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VfsError;
    use crate::node::OpenFlags;

    const MOUNTS: &str = r#"{
        "limits": { "pathBuffers": 2, "overlayDriversMax": 2 },
        "prefix": "/data",
        "fallback": { "files": { "/data/logs/today.txt": "hello" } },
        "drivers": [
            { "name": "flash", "tree": { "dirs": ["boot"], "files": { "x": "1" } } },
            { "name": "ram" }
        ]
    }"#;

    #[test]
    fn test_parse_mounts() {
        let config = MountConfig::from_json_str(MOUNTS).unwrap();
        assert_eq!(config.limits.path_buffers, 2);
        assert_eq!(config.limits.path_max, 1024);
        assert_eq!(config.prefix.as_deref(), Some("/data"));
        assert_eq!(config.drivers.len(), 2);
        assert_eq!(config.drivers[0].tree.dirs, vec!["boot"]);
        assert_eq!(config.drivers[1].tree, MemoryTree::default());
    }

    #[test]
    fn test_build_mounts() {
        let mounted = MountConfig::from_json_str(MOUNTS).unwrap().build().unwrap();
        let root = &mounted.root;

        assert_eq!(root.driver_names(), ["flash", "ram"]);
        assert_eq!(root.driver_capacity(), 2);
        assert!(root.overlaid().is_some());
        let names: Vec<String> = root
            .open_dir("/")
            .unwrap()
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["flash", "ram", "logs"]);

        let file = root.open_file("/logs/today.txt", OpenFlags::READ).unwrap();
        assert_eq!(file.info().unwrap().size, 5);
        root.open_dir("/flash/boot").unwrap();
    }

    #[test]
    fn test_too_many_drivers() {
        let text = r#"{
            "limits": { "overlayDriversMax": 1 },
            "drivers": [ { "name": "a" }, { "name": "b" } ]
        }"#;
        let result = MountConfig::from_json_str(text).unwrap().build();
        assert!(matches!(result, Err(VfsError::ResourceExhausted(_))));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            MountConfig::from_json_str("{ nope"),
            Err(VfsError::Json(_))
        ));
    }
}
