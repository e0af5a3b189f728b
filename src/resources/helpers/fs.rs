//! File-system resource helpers.
use std::path::{Path, PathBuf};

use crate::operations::{EntryKind, FileSystemOps};
use crate::resources::error::ResourceError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(fs: &dyn FileSystemOps, path: &Path) -> Result<(), ResourceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.create_dir_all(parent)
            .map_err(|e| ResourceError::fs("create parent", parent, e))?;
    }
    Ok(())
}

/// Sibling path used to stage a file before renaming it over `target`.
///
/// Staying in the same directory keeps the rename on one filesystem.
#[must_use]
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "dotfiles".into(), |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.dotfiles_tmp"))
}

/// Write `contents` to `path` through a staged sibling and a rename, so a
/// reader never observes a half-written file.
///
/// Any symlink at `path` is replaced rather than followed.
///
/// # Errors
///
/// Returns an error if the staged file cannot be written or renamed.
pub fn write_atomic(
    fs: &dyn FileSystemOps,
    path: &Path,
    contents: &[u8],
) -> Result<(), ResourceError> {
    ensure_parent_dir(fs, path)?;
    let tmp = staging_path(path);
    fs.write(&tmp, contents)
        .map_err(|e| ResourceError::fs("write", &tmp, e))?;
    if let Err(e) = fs.rename(&tmp, path) {
        let _ = fs.remove_file(&tmp);
        return Err(ResourceError::fs("replace", path, e));
    }
    Ok(())
}

/// Copy `source` over `target`: stage to a temp sibling, then rename it into
/// place so the window where `target` is absent or partial is as small as
/// possible.
///
/// # Errors
///
/// Returns an error if the copy or the rename fails; the staged file is
/// cleaned up and `target` is left as it was.
pub fn copy_into_place(
    fs: &dyn FileSystemOps,
    source: &Path,
    target: &Path,
) -> Result<(), ResourceError> {
    ensure_parent_dir(fs, target)?;
    let tmp = staging_path(target);
    fs.copy(source, &tmp)
        .map_err(|e| ResourceError::fs("copy", source, e))?;
    if let Err(e) = fs.rename(&tmp, target) {
        let _ = fs.remove_file(&tmp);
        return Err(ResourceError::fs("replace", target, e));
    }
    Ok(())
}

/// Remove an existing file or symlink at `path`, including broken symlinks.
/// Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(fs: &dyn FileSystemOps, path: &Path) -> Result<(), ResourceError> {
    match fs.entry_kind(path) {
        Ok(EntryKind::Absent) => Ok(()),
        Ok(_) => fs
            .remove_file(path)
            .map_err(|e| ResourceError::fs("remove", path, e)),
        Err(e) => Err(ResourceError::fs("inspect", path, e)),
    }
}

/// Read `path` as raw bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_bytes(fs: &dyn FileSystemOps, path: &Path) -> Result<Vec<u8>, ResourceError> {
    fs.read(path).map_err(|e| ResourceError::fs("read", path, e))
}

/// Read `path` as UTF-8 text, replacing invalid sequences. Only for files
/// this tool writes itself (index, run state).
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_text(fs: &dyn FileSystemOps, path: &Path) -> Result<String, ResourceError> {
    read_bytes(fs, path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
