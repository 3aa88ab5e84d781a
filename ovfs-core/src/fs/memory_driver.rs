//! In-memory driver implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::driver::VfsDriver;
use crate::error::{VfsError, VfsResult};
use crate::node::{DirEntry, DirNode, DirectoryNode, FileNode, FileObject, NodeAttr, OpenFlags};
use crate::path::{self, SEPARATOR};

/// Default maximum path length for a standalone memory driver.
const DEFAULT_PATH_MAX: usize = 1024;

/// Simple in-memory directory tree.
///
/// The tree is filled in during setup through `&mut self`; once shared,
/// only the working directory changes.
pub struct MemoryDriver {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    cwd: RwLock<String>,
    path_max: usize,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::with_path_max(DEFAULT_PATH_MAX)
    }
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_max(path_max: usize) -> Self {
        Self {
            dirs: BTreeSet::from(["/".to_string()]),
            files: BTreeMap::new(),
            cwd: RwLock::new("/".to_string()),
            path_max,
        }
    }

    /// Create with initial files. Parent directories are created as needed.
    pub fn with_files<I, S>(files: I) -> VfsResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let mut drv = Self::new();
        for (name, data) in files {
            drv.add_file(name.as_ref(), data)?;
        }
        Ok(drv)
    }

    /// Add a directory, and any missing parents.
    pub fn add_dir(&mut self, path: &str) -> VfsResult<()> {
        let path = self.absolute(path, "/")?;
        if self.files.contains_key(&path) {
            return Err(VfsError::NotADirectory(path));
        }
        self.insert_dirs(&path);
        Ok(())
    }

    /// Add a file. Parent directories are created as needed.
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> VfsResult<()> {
        let path = self.absolute(path, "/")?;
        if self.dirs.contains(&path) {
            return Err(VfsError::IsADirectory(path));
        }
        self.insert_dirs(parent_of(&path));
        self.files.insert(path, data.into());
        Ok(())
    }

    /// Add a file from string content.
    pub fn add_file_str(&mut self, path: &str, content: &str) -> VfsResult<()> {
        self.add_file(path, content.as_bytes().to_vec())
    }

    pub fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(p) => self.dirs.contains(&p) || self.files.contains_key(&p),
            Err(_) => false,
        }
    }

    fn insert_dirs(&mut self, dir: &str) {
        let mut dir = dir;
        while dir != "/" && self.dirs.insert(dir.to_string()) {
            dir = parent_of(dir);
        }
    }

    fn resolve(&self, path: &str) -> VfsResult<String> {
        let cwd = self.cwd.read().map_err(|_| VfsError::LockPoisoned)?;
        self.absolute(path, &cwd)
    }

    /// Absolute, normalized form of `path`, without trailing separator.
    fn absolute(&self, path: &str, cwd: &str) -> VfsResult<String> {
        let mut buf = String::new();
        if !path.starts_with(SEPARATOR) {
            path::append(&mut buf, cwd, self.path_max)?;
        }
        path::append(&mut buf, path, self.path_max)?;
        path::normalize(&mut buf, self.path_max)?;
        if buf.len() > 1 && buf.ends_with(SEPARATOR) {
            buf.pop();
        }
        Ok(buf)
    }

    fn children(&self, dir: &str) -> Vec<DirEntry> {
        let prefix = if dir == "/" {
            "/".to_string()
        } else {
            format!("{}/", dir)
        };
        let child_name = |p: &str| -> Option<String> {
            let rest = p.strip_prefix(&prefix)?;
            (!rest.is_empty() && !rest.contains(SEPARATOR)).then(|| rest.to_string())
        };

        let dirs = self.dirs.iter().filter_map(|d| {
            child_name(d).map(|name| DirEntry {
                name,
                attr: NodeAttr::DIR,
                size: 0,
            })
        });
        let files = self.files.iter().filter_map(|(f, data)| {
            child_name(f).map(|name| DirEntry {
                name,
                attr: NodeAttr::ARCHIVE,
                size: data.len() as u64,
            })
        });

        let mut entries: Vec<DirEntry> = dirs.chain(files).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

impl VfsDriver for MemoryDriver {
    fn set_cwd(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path)?;
        if !self.dirs.contains(&resolved) {
            return Err(if self.files.contains_key(&resolved) {
                VfsError::NotADirectory(resolved)
            } else {
                VfsError::NotFound(resolved)
            });
        }
        *self.cwd.write().map_err(|_| VfsError::LockPoisoned)? = resolved;
        Ok(())
    }

    fn get_cwd(&self, buf: &mut String, size: usize) -> VfsResult<()> {
        let cwd = self.cwd.read().map_err(|_| VfsError::LockPoisoned)?;
        buf.clear();
        path::append(buf, &cwd, size)
    }

    fn open_dir(&self, path: &str) -> VfsResult<DirNode> {
        let resolved = self.resolve(path)?;
        if self.dirs.contains(&resolved) {
            return Ok(DirNode::new(MemoryDirNode {
                entries: self.children(&resolved),
                index: 0,
            }));
        }
        if self.files.contains_key(&resolved) {
            return Err(VfsError::NotADirectory(resolved));
        }
        Err(VfsError::NotFound(resolved))
    }

    fn open_file(&self, path: &str, flags: OpenFlags) -> VfsResult<FileNode> {
        let resolved = self.resolve(path)?;
        if let Some(data) = self.files.get(&resolved) {
            return Ok(FileNode::new(MemoryFile {
                entry: DirEntry {
                    name: name_of(&resolved).to_string(),
                    attr: NodeAttr::ARCHIVE,
                    size: data.len() as u64,
                },
                flags,
            }));
        }
        if self.dirs.contains(&resolved) {
            return Err(VfsError::IsADirectory(resolved));
        }
        Err(VfsError::NotFound(resolved))
    }
}

/// Directory listing taken when the directory was opened.
struct MemoryDirNode {
    entries: Vec<DirEntry>,
    index: usize,
}

impl DirectoryNode for MemoryDirNode {
    fn first(&mut self) -> VfsResult<Option<DirEntry>> {
        self.index = 0;
        self.next()
    }

    fn next(&mut self) -> VfsResult<Option<DirEntry>> {
        let entry = self.entries.get(self.index).cloned();
        if entry.is_some() {
            self.index += 1;
        }
        Ok(entry)
    }
}

struct MemoryFile {
    entry: DirEntry,
    flags: OpenFlags,
}

impl FileObject for MemoryFile {
    fn info(&self) -> DirEntry {
        self.entry.clone()
    }

    fn flags(&self) -> OpenFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(node: &DirNode) -> Vec<String> {
        node.entries().unwrap().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_add_and_open_file() {
        let mut drv = MemoryDriver::new();
        drv.add_file_str("/logs/today.txt", "hello").unwrap();

        assert!(drv.exists("/logs"));
        assert!(drv.exists("logs/today.txt"));

        let file = drv.open_file("/logs/today.txt", OpenFlags::READ).unwrap();
        let info = file.info().unwrap();
        assert_eq!(info.name, "today.txt");
        assert_eq!(info.size, 5);
        assert_eq!(file.flags().unwrap(), OpenFlags::READ);
    }

    #[test]
    fn test_list_directory_sorted() {
        let drv = MemoryDriver::with_files([
            ("b.txt", vec![1, 2]),
            ("a/x.bin", vec![3]),
            ("c.txt", vec![]),
        ])
        .unwrap();

        let root = drv.open_dir("/").unwrap();
        assert_eq!(names(&root), vec!["a", "b.txt", "c.txt"]);

        let entries = root.entries().unwrap();
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].size, 2);

        let sub = drv.open_dir("a").unwrap();
        assert_eq!(names(&sub), vec!["x.bin"]);
    }

    #[test]
    fn test_wrong_kind_errors() {
        let mut drv = MemoryDriver::new();
        drv.add_file("f", vec![]).unwrap();
        drv.add_dir("d/e").unwrap();

        assert!(matches!(drv.open_dir("f"), Err(VfsError::NotADirectory(_))));
        assert!(matches!(
            drv.open_file("d", OpenFlags::READ),
            Err(VfsError::IsADirectory(_))
        ));
        assert!(matches!(drv.open_dir("nope"), Err(VfsError::NotFound(_))));
        assert!(matches!(drv.add_dir("f"), Err(VfsError::NotADirectory(_))));
    }

    #[test]
    fn test_cwd() {
        let mut drv = MemoryDriver::new();
        drv.add_file("/data/logs/today.txt", vec![]).unwrap();

        drv.set_cwd("data").unwrap();
        drv.set_cwd("logs/../logs").unwrap();

        let mut buf = String::new();
        drv.get_cwd(&mut buf, 64).unwrap();
        assert_eq!(buf, "/data/logs");

        drv.open_file("today.txt", OpenFlags::READ).unwrap();
        assert!(drv.set_cwd("today.txt").is_err());
        assert!(matches!(drv.get_cwd(&mut buf, 4), Err(VfsError::PathTooLong)));
    }

    #[test]
    fn test_empty_path_is_cwd() {
        let mut drv = MemoryDriver::new();
        drv.add_file("/a/b", vec![]).unwrap();
        assert_eq!(names(&drv.open_dir("").unwrap()), vec!["a"]);
    }
}
