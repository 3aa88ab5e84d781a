//! Fixed-capacity table of named drivers.

use std::sync::Arc;

use crate::error::{VfsError, VfsResult};
use crate::fs::driver::VfsDriver;
use crate::path::{self, SEPARATOR};

/// Registered drivers, in registration order.
///
/// The names are kept in their own shared list so open root directory
/// nodes can enumerate them without borrowing the overlay.
pub(crate) struct Registry {
    names: Arc<Vec<String>>,
    drivers: Vec<Arc<dyn VfsDriver>>,
    capacity: usize,
    name_max: usize,
}

impl Registry {
    pub(crate) fn new(capacity: usize, name_max: usize) -> Self {
        Self {
            names: Arc::new(Vec::with_capacity(capacity)),
            drivers: Vec::with_capacity(capacity),
            capacity,
            name_max,
        }
    }

    /// Append a driver under `name`.
    ///
    /// The name must be a single path component, and names are unique.
    pub(crate) fn register(&mut self, name: &str, driver: Arc<dyn VfsDriver>) -> VfsResult<()> {
        if self.drivers.len() >= self.capacity {
            return Err(VfsError::ResourceExhausted("overlay driver table"));
        }
        if name.is_empty() || name == "." || name == ".." || name.contains(SEPARATOR) {
            return Err(VfsError::InvalidPath(name.to_string()));
        }
        if name.len() > self.name_max {
            return Err(VfsError::NameTooLong);
        }
        if self.names.iter().any(|n| n == name) {
            return Err(VfsError::DriverExists(name.to_string()));
        }

        Arc::make_mut(&mut self.names).push(name.to_string());
        self.drivers.push(driver);
        Ok(())
    }

    /// Consume the first component of `cursor` and look it up.
    ///
    /// On failure the cursor has still been advanced and must not be
    /// reused.
    pub(crate) fn match_driver(&self, cursor: &mut &str) -> VfsResult<&Arc<dyn VfsDriver>> {
        let fname = path::parse_component(cursor, self.name_max)?;

        self.names
            .iter()
            .position(|n| n == fname)
            .map(|i| &self.drivers[i])
            .ok_or_else(|| VfsError::NotFound(fname.to_string()))
    }

    pub(crate) fn names(&self) -> &Arc<Vec<String>> {
        &self.names
    }

    pub(crate) fn len(&self) -> usize {
        self.drivers.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryDriver;

    fn driver() -> Arc<dyn VfsDriver> {
        Arc::new(MemoryDriver::new())
    }

    #[test]
    fn test_register_until_full() {
        let mut reg = Registry::new(2, 12);
        reg.register("flash", driver()).unwrap();
        reg.register("ram", driver()).unwrap();

        assert!(matches!(
            reg.register("sd", driver()),
            Err(VfsError::ResourceExhausted(_))
        ));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.capacity(), 2);

        // Earlier entries still resolve.
        let mut cursor = "flash/x";
        assert!(reg.match_driver(&mut cursor).is_ok());
        let mut cursor = "ram";
        assert!(reg.match_driver(&mut cursor).is_ok());
    }

    #[test]
    fn test_match_returns_registered_driver() {
        let flash = driver();
        let mut reg = Registry::new(4, 12);
        reg.register("ram", driver()).unwrap();
        reg.register("flash", Arc::clone(&flash)).unwrap();

        let mut cursor = "flash/a/b/";
        let found = reg.match_driver(&mut cursor).unwrap();
        assert!(Arc::ptr_eq(found, &flash));
        assert_eq!(cursor, "a/b/");
    }

    #[test]
    fn test_match_is_exact() {
        let mut reg = Registry::new(4, 12);
        reg.register("flash", driver()).unwrap();

        for path in ["flas/x", "flash2/x", "Flash/x"] {
            let mut cursor = path;
            assert!(matches!(
                reg.match_driver(&mut cursor),
                Err(VfsError::NotFound(_))
            ));
        }
    }

    #[test]
    fn test_rejects_duplicates_and_bad_names() {
        let mut reg = Registry::new(4, 8);
        reg.register("flash", driver()).unwrap();

        assert!(matches!(
            reg.register("flash", driver()),
            Err(VfsError::DriverExists(_))
        ));
        assert!(matches!(reg.register("", driver()), Err(VfsError::InvalidPath(_))));
        assert!(matches!(reg.register("a/b", driver()), Err(VfsError::InvalidPath(_))));
        assert!(matches!(reg.register("..", driver()), Err(VfsError::InvalidPath(_))));
        assert!(matches!(
            reg.register("muchtoolong", driver()),
            Err(VfsError::NameTooLong)
        ));
        assert_eq!(reg.names().as_slice(), ["flash".to_string()]);
    }
}
