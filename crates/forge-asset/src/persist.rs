//! Writing emitted files to a target directory

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::asset::DynAsset;
use crate::error::PersistError;

/// Resolve a relative file name beneath `dir`, rejecting escapes
fn target_path(dir: &Path, filename: &str) -> Result<PathBuf, PersistError> {
    let relative = Path::new(filename);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if filename.is_empty() || escapes {
        return Err(PersistError::InvalidPath(filename.to_string()));
    }
    Ok(dir.join(relative))
}

/// Write every file of `asset` beneath `dir`
///
/// Parent directories are created as needed. Returns the written paths in
/// emission order.
///
/// # Errors
/// Returns [`PersistError::InvalidPath`] for absolute or escaping names and
/// [`PersistError::Io`] when a write fails.
pub fn persist_to_file(asset: &dyn DynAsset, dir: &Path) -> Result<Vec<PathBuf>, PersistError> {
    let files = asset.files();
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = target_path(dir, &file.filename)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, &file.data).map_err(|source| PersistError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(asset = asset.name(), path = %path.display(), "wrote asset file");
        written.push(path);
    }
    Ok(written)
}

/// Remove every file of `asset` from `dir`; missing files are ignored
///
/// # Errors
/// Returns [`PersistError`] for escaping names or failed removals.
pub fn delete_from_disk(asset: &dyn DynAsset, dir: &Path) -> Result<(), PersistError> {
    for file in asset.files() {
        let path = target_path(dir, &file.filename)?;
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(asset = asset.name(), path = %path.display(), "removed asset file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PersistError::Io { path, source }),
        }
    }
    Ok(())
}
