//! Filesystem drivers.
//!
//! This module provides the driver layer:
//! - `VfsDriver`: Contract shared by every driver
//! - `MemoryDriver`: In-memory leaf driver
//! - `OverlayDriver`: Union of named drivers over an optional overlaid driver

mod driver;
mod memory_driver;
pub mod overlay;

pub use driver::VfsDriver;
pub use memory_driver::MemoryDriver;
pub use overlay::OverlayDriver;
