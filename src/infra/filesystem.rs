//! Filesystem operations
//!
//! Handles file and directory operations.

use std::fs::{File, FileTimes};
use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove whatever sits at `path`: a file, a symlink (not its target) or a
/// directory tree. Missing paths are fine.
pub fn remove_path(path: &Path) -> Result<(), FilesystemError> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };

    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    result.map_err(|e| FilesystemError::Remove {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a regular file, keeping permissions and timestamps
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let copy_err = |e: std::io::Error| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    };

    std::fs::copy(from, to).map_err(copy_err)?;

    let meta = std::fs::metadata(from).map_err(copy_err)?;
    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    // The copy carries the source mode, which may be read-only.
    File::open(to)
        .and_then(|f| f.set_times(times))
        .map_err(copy_err)
}

/// Recreate the symlink at `from` at `to`, keeping the raw target
#[cfg(unix)]
pub fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let symlink_err = |e: std::io::Error| FilesystemError::Symlink {
        path: to.to_path_buf(),
        error: e.to_string(),
    };

    let target = std::fs::read_link(from).map_err(symlink_err)?;
    std::os::unix::fs::symlink(target, to).map_err(symlink_err)
}

/// Recreate the symlink at `from` at `to`, keeping the raw target
#[cfg(not(unix))]
pub fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    Err(FilesystemError::Symlink {
        path: to.to_path_buf(),
        error: format!("symlinks are not supported on this platform ({})", from.display()),
    })
}
