//! Virtual file system for memsh.
//!
//! The interpreter never touches the host filesystem directly. Every
//! redirection, `cat`, `diff` or `patch` goes through the [`Vfs`] trait,
//! implemented by the arena-backed [`MemoryVfs`]. Relative paths are
//! resolved against the VFS's own working directory.

mod host;
mod memory;
mod path;

use std::time::SystemTime;

use memsh_types::error::Result;

pub use host::{export_host, import_host};
pub use memory::{MemoryVfs, Node, NodeId, NodeKind, ROOT};
pub use path::{join, normalize_path};

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Metadata returned by [`Vfs::stat`].
#[derive(Debug, Clone, Copy)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
    pub modified: SystemTime,
}

/// An entry produced by a recursive [`Vfs::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walked directory, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
}

/// Path-addressed filesystem operations used by the interpreter and commands.
pub trait Vfs {
    /// List a directory in insertion order.
    fn read_dir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read a file's full content.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Append raw bytes to a file, creating it when missing.
    fn append(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Update a node's modification time, creating an empty file when missing.
    fn touch(&mut self, path: &str) -> Result<()>;

    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create a single directory. Fails if it exists or the parent is missing.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Create a directory and any missing ancestors (`mkdir -p`).
    fn mkdir_all(&mut self, path: &str) -> Result<()>;

    /// Remove a file or directory. Non-empty directories need `recursive`.
    fn remove(&mut self, path: &str, recursive: bool) -> Result<()>;

    /// Move a node. Moving onto an existing directory moves into it.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Copy a node. Directories require `recursive`.
    fn copy(&mut self, from: &str, to: &str, recursive: bool) -> Result<()>;

    fn exists(&self, path: &str) -> bool;

    /// Recursively list everything below a directory, depth first.
    fn walk(&self, path: &str) -> Result<Vec<WalkEntry>>;

    /// Absolute path of the working directory.
    fn current_dir(&self) -> String;

    fn change_dir(&mut self, path: &str) -> Result<()>;

    /// Read a file as (lossy) UTF-8 text.
    fn read_to_string(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Lexically normalize `path` against the working directory.
    fn absolute(&self, path: &str) -> String {
        normalize_path(&self.current_dir(), path)
    }

    /// Whether `path` names a directory.
    fn is_dir(&self, path: &str) -> bool {
        self.stat(path)
            .is_ok_and(|meta| meta.kind == EntryKind::Directory)
    }
}

