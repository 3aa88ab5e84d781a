//! Overlay VFS Core
//!
//! This crate provides the composition layer of a virtual filesystem:
//! - Overlay driver unioning named drivers over an optional overlaid driver
//! - Shared pool of fixed-capacity path buffers
//! - Reference-counted directory and file node handles
//!
//! # Architecture
//!
//! The VFS uses a layered design:
//! - `Vfs`: Explicitly passed owner of the fixed pools and limits
//! - `VfsDriver` trait: Contract every driver implements
//! - `OverlayDriver`: Routes `/<name>/...` to registered drivers, the rest
//!   to the overlaid driver under a path prefix
//! - `DirectoryNode` / `FileObject` traits: Nodes behind `NodeHandle`s

pub mod buffers;
pub mod config;
pub mod error;
pub mod fs;
pub mod mounts;
pub mod node;
pub mod path;
pub mod vfs;

pub use buffers::{PathBuffer, PathBufferPool, PooledPath};
pub use config::VfsConfig;
pub use error::{VfsError, VfsResult};
pub use fs::{MemoryDriver, OverlayDriver, VfsDriver};
pub use mounts::{DriverMount, MemoryTree, MountConfig, Mounted};
pub use node::{
    DirEntry, DirNode, DirectoryNode, FileNode, FileObject, NodeAttr, NodeHandle, OpenFlags,
};
pub use vfs::Vfs;
