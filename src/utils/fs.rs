use crate::error::{ArcfetchError, Result};
use std::path::Path;

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e))?;
    }
    Ok(())
}

/// Writes `contents` to `path`, creating parent directories first.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir_exists(parent)?;
        }
    }

    std::fs::write(path, contents).map_err(|e| map_io_error(path, e))?;
    Ok(())
}

/// Returns true when `path` is missing or an empty directory.
pub fn is_empty_dir(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == std::io::ErrorKind::NotFound,
    }
}

fn map_io_error(path: &Path, e: std::io::Error) -> ArcfetchError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ArcfetchError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ArcfetchError::from(e),
    }
}
