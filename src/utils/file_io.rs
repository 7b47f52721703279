use std::fs;
use std::fs::create_dir_all;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::error;

use crate::Result;
use crate::StorageError;

pub(crate) fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create cache directory {:?}: {:?}", parent_dir, e);
                return Err(StorageError::PathError {
                    path: parent_dir.to_path_buf(),
                    source: e,
                }
                .into());
            }
            debug!("created cache directory: {:?}", parent_dir);
        }
    }
    Ok(())
}

/// Reads a whole file. A missing file maps to [`StorageError::NotFound`]
/// so callers can tell "no backup yet" from a real I/O failure.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(path.to_path_buf()).into()),
        Err(e) => Err(StorageError::PathError {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}

/// Replaces `path` with `buf`.
///
/// Bytes land in a sibling `.tmp` file first and are renamed over the target,
/// so a reader never observes a half-written snapshot.
pub(crate) fn write_file_atomically(
    path: &Path,
    buf: &[u8],
) -> Result<()> {
    create_parent_dir_if_not_exist(path)?;

    let tmp_path = tmp_sibling(path);
    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(buf)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::PathError {
            path: path.to_path_buf(),
            source: e,
        }
        .into()
    })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
