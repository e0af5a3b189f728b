//! Timestamped backups of files displaced by the installers.
//!
//! Layout under the backup root (`~/.dotfiles-backups` by default):
//!
//! ```text
//! .dotfiles-backups/
//! ├── index.json                         list of BackupEntry records
//! ├── 20250301T101500.123456-0/
//! │   └── .gitconfig
//! └── 20250301T101500.123789-1/
//!     └── .zshrc
//! ```
//!
//! Each backup gets its own directory, so two backups of files with the same
//! name (or of the same file twice in one second) can never collide.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify::resolve_link_destination;
use super::error::ResourceError;
use super::helpers::fs::{copy_into_place, read_text, write_atomic};
use super::paths::PathResolver;
use crate::operations::{EntryKind, FileSystemOps};

/// Directory name of the backup root inside the home directory.
pub const BACKUP_DIR_NAME: &str = ".dotfiles-backups";

const INDEX_FILE: &str = "index.json";

/// Process-wide counter appended to backup ids so that two backups taken
/// within the same microsecond still get distinct directories.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One backed-up file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Unique, sortable identifier (also the backup's directory name).
    pub id: String,
    /// Where the file lived before it was displaced.
    pub original_path: PathBuf,
    /// Where the copy is stored.
    pub backup_path: PathBuf,
    /// When the backup was taken.
    pub created_at: DateTime<Utc>,
}

/// Retention limits applied by [`BackupManager::clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Backups older than this many days are removed.
    pub max_age_days: u32,
    /// At most this many backups are kept per original path; `0` disables
    /// the count limit.
    pub max_count: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            max_count: 5,
        }
    }
}

/// Outcome of [`BackupManager::clean`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Backups deleted, or in a dry run the ones that would be.
    pub removed: Vec<BackupEntry>,
    /// Backups that could not be deleted, with the error. They stay indexed.
    pub failed: Vec<(BackupEntry, String)>,
}

/// Creates, lists, restores and prunes backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    fs: Arc<dyn FileSystemOps>,
    root: PathBuf,
}

impl BackupManager {
    /// Manager storing backups under `<home>/.dotfiles-backups`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystemOps>, home: &Path) -> Self {
        Self::with_root(fs, home.join(BACKUP_DIR_NAME))
    }

    /// Manager storing backups under an explicit root.
    #[must_use]
    pub const fn with_root(fs: Arc<dyn FileSystemOps>, root: PathBuf) -> Self {
        Self { fs, root }
    }

    /// The backup root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Copy `path` into a fresh backup directory and record it in the index.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::BackupFailed`] if the copy cannot be made or
    /// recorded.  Nothing is left behind in that case, and callers must not
    /// touch `path`.
    pub fn backup(&self, path: &Path) -> Result<BackupEntry, ResourceError> {
        self.backup_at(path, Utc::now())
    }

    pub(crate) fn backup_at(
        &self,
        path: &Path,
        now: DateTime<Utc>,
    ) -> Result<BackupEntry, ResourceError> {
        let failed = |source: std::io::Error| ResourceError::BackupFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut index = self
            .load_index()
            .map_err(|e| failed(std::io::Error::other(e.to_string())))?;

        let (id, dir) = loop {
            let id = next_id(now);
            let dir = self.root.join(&id);
            if self.fs.entry_kind(&dir).map_err(failed)? == EntryKind::Absent {
                break (id, dir);
            }
        };
        self.fs.create_dir_all(&dir).map_err(failed)?;

        let name = path
            .file_name()
            .map_or_else(|| "unnamed".into(), std::ffi::OsStr::to_os_string);
        let backup_path = dir.join(name);
        if let Err(e) = self.fs.copy(path, &backup_path) {
            let _ = self.fs.remove_dir(&dir);
            return Err(failed(e));
        }

        let entry = BackupEntry {
            id,
            original_path: path.to_path_buf(),
            backup_path,
            created_at: now,
        };
        index.push(entry.clone());
        if let Err(e) = self.save_index(&index) {
            let _ = self.fs.remove_file(&entry.backup_path);
            let _ = self.fs.remove_dir(&dir);
            return Err(failed(std::io::Error::other(e.to_string())));
        }
        Ok(entry)
    }

    /// All backups whose files still exist, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<BackupEntry>, ResourceError> {
        let mut entries: Vec<BackupEntry> = self
            .load_index()?
            .into_iter()
            .filter(|e| {
                self.fs
                    .entry_kind(&e.backup_path)
                    .is_ok_and(|k| k != EntryKind::Absent)
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    /// Look a backup up by id or by its stored file path.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::BackupNotFound`] if nothing matches.
    pub fn find(&self, key: &str) -> Result<BackupEntry, ResourceError> {
        self.list()?
            .into_iter()
            .find(|e| e.id == key || e.backup_path == Path::new(key))
            .ok_or_else(|| ResourceError::BackupNotFound {
                id: key.to_string(),
            })
    }

    /// Copy a backup back to its original path.
    ///
    /// A symlink at the original path that points into the repository is a
    /// live managed link; restoring over it requires `overwrite`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::RestoreRefused`] when the original path is a
    /// directory or a managed symlink (without `overwrite`), or a filesystem
    /// error if the copy fails.
    pub fn restore(
        &self,
        entry: &BackupEntry,
        paths: &PathResolver,
        overwrite: bool,
    ) -> Result<(), ResourceError> {
        let original = &entry.original_path;
        let refused = |reason: String| ResourceError::RestoreRefused {
            path: original.clone(),
            reason,
        };

        match self
            .fs
            .entry_kind(original)
            .map_err(|e| ResourceError::fs("inspect", original, e))?
        {
            EntryKind::Directory | EntryKind::Other => {
                return Err(refused("a directory or special file is in the way".into()));
            }
            EntryKind::Symlink if !overwrite => {
                let current = self
                    .fs
                    .read_link(original)
                    .map_err(|e| ResourceError::fs("read link", original, e))?;
                let resolved = resolve_link_destination(original, &current);
                if paths.is_inside_root(&resolved) {
                    return Err(refused(format!(
                        "it is a managed symlink to {}; use --overwrite to replace it",
                        current.display()
                    )));
                }
            }
            _ => {}
        }

        if self.fs.entry_kind(&entry.backup_path).ok() == Some(EntryKind::Absent) {
            return Err(ResourceError::BackupNotFound {
                id: entry.id.clone(),
            });
        }
        copy_into_place(self.fs.as_ref(), &entry.backup_path, original)
    }

    /// Delete a backup's files and drop it from the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored copy cannot be deleted (the entry then
    /// stays indexed) or if the index cannot be rewritten.
    pub fn remove(&self, entry: &BackupEntry) -> Result<(), ResourceError> {
        self.delete_files(entry)?;
        let index: Vec<BackupEntry> = self
            .load_index()?
            .into_iter()
            .filter(|e| e.id != entry.id)
            .collect();
        self.save_index(&index)
    }

    /// Remove backups outside `policy`.
    ///
    /// In a dry run nothing is deleted and [`CleanReport::removed`] lists what
    /// would go. Entries whose files cannot be deleted stay in the index and
    /// are reported in [`CleanReport::failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or rewritten.
    pub fn clean(
        &self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<CleanReport, ResourceError> {
        let entries = self.list()?;
        let expired = select_expired(&entries, policy, now);
        if dry_run {
            return Ok(CleanReport {
                removed: expired,
                failed: Vec::new(),
            });
        }

        let mut report = CleanReport::default();
        for entry in expired {
            match self.delete_files(&entry) {
                Ok(()) => report.removed.push(entry),
                Err(e) => report.failed.push((entry, e.to_string())),
            }
        }
        let remaining: Vec<BackupEntry> = entries
            .into_iter()
            .filter(|e| !report.removed.iter().any(|x| x.id == e.id))
            .collect();
        self.save_index(&remaining)?;
        Ok(report)
    }

    /// Delete the stored copy and its directory. A copy that is already gone
    /// counts as deleted.
    fn delete_files(&self, entry: &BackupEntry) -> Result<(), ResourceError> {
        let path = &entry.backup_path;
        match self.fs.remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(ResourceError::fs("remove", path, e));
            }
            _ => {}
        }
        if let Some(dir) = path.parent() {
            match self.fs.remove_dir(dir) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    return Err(ResourceError::fs("remove", dir, e));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn load_index(&self) -> Result<Vec<BackupEntry>, ResourceError> {
        let path = self.index_path();
        let kind = self
            .fs
            .entry_kind(&path)
            .map_err(|e| ResourceError::fs("inspect", &path, e))?;
        if kind == EntryKind::Absent {
            return Ok(Vec::new());
        }
        let text = read_text(self.fs.as_ref(), &path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| ResourceError::CorruptIndex { path, source })
    }

    fn save_index(&self, entries: &[BackupEntry]) -> Result<(), ResourceError> {
        let path = self.index_path();
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ResourceError::fs("serialize", &path, std::io::Error::other(e)))?;
        write_atomic(self.fs.as_ref(), &path, json.as_bytes())
    }
}

fn next_id(now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        now.format("%Y%m%dT%H%M%S%.6f"),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// Entries that fall outside `policy`: older than `max_age_days`, or beyond
/// the newest `max_count` for the same original path.
///
/// `entries` must be sorted newest first, as returned by
/// [`BackupManager::list`].
#[must_use]
pub fn select_expired(
    entries: &[BackupEntry],
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<BackupEntry> {
    let max_age = chrono::Duration::days(i64::from(policy.max_age_days));
    let mut seen: HashMap<&Path, usize> = HashMap::new();
    entries
        .iter()
        .filter(|e| {
            let n = seen.entry(e.original_path.as_path()).or_insert(0);
            *n += 1;
            let too_old = now.signed_duration_since(e.created_at) > max_age;
            let too_many = policy.max_count > 0 && *n > policy.max_count;
            too_old || too_many
        })
        .cloned()
        .collect()
}
