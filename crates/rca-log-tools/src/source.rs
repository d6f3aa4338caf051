//! Bundle source abstraction: read bundle files from disk, mocks, or other backends.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{AnalysisError, AnalysisResult};

/// Abstraction for reading the files of an incident bundle.
///
/// Enables mocking for tests and swappable backends (staged uploads,
/// archives, etc.).
#[async_trait]
pub trait BundleSource: Send + Sync {
    /// Read a whole file as text. Invalid UTF-8 is replaced, not rejected.
    ///
    /// A missing file yields `AnalysisError::MissingFile`, any other failure
    /// `AnalysisError::FileAccess`.
    async fn read_to_string(&self, path: &Path) -> AnalysisResult<String>;

    /// List the plain file names directly inside `dir`, sorted. Symlinks to
    /// files count as files.
    ///
    /// Fails with `AnalysisError::UnreadableBundle` when the directory does
    /// not exist or cannot be listed.
    async fn list_dir(&self, dir: &Path) -> AnalysisResult<Vec<String>>;
}

/// Reads bundles from the local filesystem.
pub struct FileBundleSource;

#[async_trait]
impl BundleSource for FileBundleSource {
    async fn read_to_string(&self, path: &Path) -> AnalysisResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AnalysisError::from_io(path, &e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn list_dir(&self, dir: &Path) -> AnalysisResult<Vec<String>> {
        let unreadable = |e: std::io::Error| AnalysisError::UnreadableBundle {
            path: dir.to_path_buf(),
            message: e.to_string(),
        };

        let mut reader = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(unreadable)? {
            // follows symlinks; a dangling link is skipped
            let is_file = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file && let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
