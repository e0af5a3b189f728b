//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that the reconciliation core can be
//! unit-tested without depending on the host filesystem's behaviour.
//! Production code uses [`SystemFileSystemOps`]; tests wrap it to inject
//! failures at chosen operations.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What an `lstat` of a path reports, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing exists at the path.
    Absent,
    /// A symbolic link (possibly dangling).
    Symlink,
    /// A regular file.
    File,
    /// A real directory.
    Directory,
    /// Anything else (socket, fifo, device).
    Other,
}

/// Abstraction over every filesystem call made by the reconciliation core.
///
/// Implement this trait to swap in a fake during unit tests, keeping the
/// classifier and installers independent of real I/O.  The production
/// implementation is [`SystemFileSystemOps`].
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Inspect `path` without following a trailing symlink.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read for a reason other
    /// than the path not existing.
    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind>;

    /// Read the immediate destination of the symbolic link at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a symlink or cannot be read.
    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf>;

    /// Last-modified time of the entry at `path` (not following symlinks).
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    fn modified(&self, path: &Path) -> std::io::Result<SystemTime>;

    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Create or truncate `path` and write `contents` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;

    /// Copy the file at `from` to `to`, overwriting `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Create a symbolic link at `link` pointing to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created.
    fn symlink(&self, destination: &Path, link: &Path) -> std::io::Result<()>;

    /// Remove the file or symlink at `path` (never recursive).
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Remove the empty directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is not empty or cannot be removed.
    fn remove_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Create `path` and all of its missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Atomically rename `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Return the immediate child paths inside `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be opened or read as a directory.
    fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) => {
                let ft = meta.file_type();
                Ok(if ft.is_symlink() {
                    EntryKind::Symlink
                } else if ft.is_file() {
                    EntryKind::File
                } else if ft.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::Other
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EntryKind::Absent),
            Err(e) => Err(e),
        }
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
        std::fs::symlink_metadata(path)?.modified()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        std::fs::write(path, contents)
    }

    fn copy(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn symlink(&self, destination: &Path, link: &Path) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(destination, link)
        }
        #[cfg(windows)]
        {
            if destination.is_dir() {
                std::os::windows::fs::symlink_dir(destination, link)
            } else {
                std::os::windows::fs::symlink_file(destination, link)
            }
        }
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::rename(from, to)
    }

    fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|e| e.map(|entry| entry.path()))
            .collect()
    }
}

/// Filesystem operations that [`FaultyFs`] can be told to fail.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    /// [`FileSystemOps::copy`]
    Copy,
    /// [`FileSystemOps::symlink`]
    Symlink,
    /// [`FileSystemOps::remove_file`]
    RemoveFile,
    /// [`FileSystemOps::write`]
    Write,
    /// [`FileSystemOps::create_dir_all`]
    CreateDirAll,
    /// [`FileSystemOps::rename`]
    Rename,
}

/// Test double that behaves like [`SystemFileSystemOps`] except for the
/// operations listed in `failing`, which return `PermissionDenied`.
///
/// Lets tests prove that a failed backup copy never leads to a destructive
/// step, or that a failed link creation is reported per entry.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FaultyFs {
    failing: std::collections::HashSet<FsOp>,
    calls: std::sync::Mutex<Vec<(FsOp, PathBuf)>>,
}

#[cfg(test)]
impl FaultyFs {
    /// Create a wrapper that fails every operation in `ops`.
    #[must_use]
    pub fn failing(ops: &[FsOp]) -> Self {
        Self {
            failing: ops.iter().copied().collect(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Return the paths passed to `op`, in call order.
    #[must_use]
    pub fn calls_to(&self, op: FsOp) -> Vec<PathBuf> {
        self.calls.lock().map_or_else(
            |_| Vec::new(),
            |guard| {
                guard
                    .iter()
                    .filter(|(o, _)| *o == op)
                    .map(|(_, p)| p.clone())
                    .collect()
            },
        )
    }

    fn check(&self, op: FsOp, path: &Path) -> std::io::Result<()> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((op, path.to_path_buf()));
        }
        if self.failing.contains(&op) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("injected {op:?} failure"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
impl FileSystemOps for FaultyFs {
    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind> {
        SystemFileSystemOps.entry_kind(path)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        SystemFileSystemOps.read_link(path)
    }

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
        SystemFileSystemOps.modified(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        SystemFileSystemOps.read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        self.check(FsOp::Write, path)?;
        SystemFileSystemOps.write(path, contents)
    }

    fn copy(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        self.check(FsOp::Copy, from)?;
        SystemFileSystemOps.copy(from, to)
    }

    fn symlink(&self, destination: &Path, link: &Path) -> std::io::Result<()> {
        self.check(FsOp::Symlink, link)?;
        SystemFileSystemOps.symlink(destination, link)
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        self.check(FsOp::RemoveFile, path)?;
        SystemFileSystemOps.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> std::io::Result<()> {
        SystemFileSystemOps.remove_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        self.check(FsOp::CreateDirAll, path)?;
        SystemFileSystemOps.create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        self.check(FsOp::Rename, from)?;
        SystemFileSystemOps.rename(from, to)
    }

    fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        SystemFileSystemOps.read_dir(path)
    }
}
