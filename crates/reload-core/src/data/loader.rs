//! The load-and-validate contract consumed by the build pipeline.

use crate::data::DataManager;
use crate::error::ReloadError;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Why a data file could not be loaded.
///
/// The two kinds map to different response statuses, so loaders must keep
/// them apart.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid content in {path}: {reason}")]
    ContentInvalid { path: PathBuf, reason: String },
}

impl From<LoadError> for ReloadError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::FileAccess { path, source } => ReloadError::FileAccess { path, source },
            LoadError::ContentInvalid { path, reason } => ReloadError::content_invalid(path, reason),
        }
    }
}

/// Loads and validates a data file.
pub trait BundleLoader: Send + Sync {
    fn load(&self, path: &Path, magic: &[u8]) -> Result<DataManager, LoadError>;
}

/// Default loader reading the container format from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBundleLoader;

impl FileBundleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl BundleLoader for FileBundleLoader {
    fn load(&self, path: &Path, magic: &[u8]) -> Result<DataManager, LoadError> {
        let data = std::fs::read(path).map_err(|e| LoadError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), size = data.len(), "Read data file");
        DataManager::from_bytes(path, Bytes::from(data), magic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataFileWriter;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_access_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileBundleLoader::new().load(&temp_dir.path().join("nope.data"), b"MOCK");
        assert!(matches!(result, Err(LoadError::FileAccess { .. })));
    }

    #[test]
    fn test_directory_is_access_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileBundleLoader::new().load(temp_dir.path(), b"MOCK");
        assert!(matches!(result, Err(LoadError::FileAccess { .. })));
    }

    #[test]
    fn test_loads_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mock.data");
        DataFileWriter::new(b"MOCK")
            .data_version("1.2.3")
            .write_to(&path)
            .unwrap();

        let manager = FileBundleLoader::new().load(&path, b"MOCK").unwrap();
        assert_eq!(manager.data_version(), "1.2.3");
        assert_eq!(manager.filename(), path.as_path());
    }

    #[test]
    fn test_wrong_magic_is_content_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mock.data");
        DataFileWriter::new(b"MOCK").write_to(&path).unwrap();

        let err = FileBundleLoader::new().load(&path, b"GGUF").unwrap_err();
        assert!(matches!(err, LoadError::ContentInvalid { .. }));
        match ReloadError::from(err) {
            ReloadError::ContentInvalid { path: err_path, reason } => {
                assert_eq!(err_path, path);
                assert!(reason.contains("magic number mismatch"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
