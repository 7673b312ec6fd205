//! Read access to previously emitted files

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::asset::AssetFile;
use crate::error::LoadError;

/// Source of previously emitted files, consulted by `WritableAsset::load`
///
/// A missing file is not an error: implementations return `Ok(None)`.
pub trait FileFetcher: Send + Sync {
    /// Fetch one file by its relative name
    ///
    /// # Errors
    /// Returns [`LoadError::Io`] when the file exists but cannot be read.
    fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, LoadError>;
}

/// Fetches files from a directory on disk
#[derive(Debug, Clone)]
pub struct DiskFetcher {
    dir: PathBuf,
}

impl DiskFetcher {
    /// Fetcher rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileFetcher for DiskFetcher {
    fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, LoadError> {
        let path = self.dir.join(name);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(AssetFile::new(name, data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LoadError::Io { path, source }),
        }
    }
}

/// In-memory file set, used by tests and by stores without a directory
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    /// Empty file set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    /// Add or replace a file
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), data.into());
    }

    /// Add every file emitted by an asset
    pub fn extend_from(&mut self, files: impl IntoIterator<Item = AssetFile>) {
        for file in files {
            self.files.insert(file.filename, file.data);
        }
    }
}

impl FileFetcher for MemoryFetcher {
    fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, LoadError> {
        Ok(self
            .files
            .get(name)
            .map(|data| AssetFile::new(name, data.clone())))
    }
}
