//! Bundle analysis error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while analyzing an incident bundle.
///
/// Only `UnreadableBundle` and `Cancelled` ever escape the orchestrator; every
/// other variant is absorbed into the section it happened in.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid data in {}: {message}", path.display())]
    DataFormat { path: PathBuf, message: String },

    #[error("record {index} skipped: {reason}")]
    RecordSkipped { index: usize, reason: String },

    #[error("cannot read {}: {message}", path.display())]
    FileAccess { path: PathBuf, message: String },

    #[error("bundle directory unreadable {}: {message}", path.display())]
    UnreadableBundle { path: PathBuf, message: String },

    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn missing(path: impl AsRef<Path>) -> Self {
        Self::MissingFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn data_format(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::DataFormat {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn file_access(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn skipped(index: usize, reason: impl Into<String>) -> Self {
        Self::RecordSkipped {
            index,
            reason: reason.into(),
        }
    }

    /// Map an I/O error on `path` to the matching variant.
    pub fn from_io(path: impl AsRef<Path>, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::missing(path)
        } else {
            Self::file_access(path, err.to_string())
        }
    }

    /// Stable error kind name used in JSON failure documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingFile { .. } => "MissingFile",
            Self::DataFormat { .. } => "DataFormatError",
            Self::RecordSkipped { .. } => "RecordSkipped",
            Self::FileAccess { .. } => "FileAccessError",
            Self::UnreadableBundle { .. } => "UnreadableBundle",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Path that caused the error, if the error is tied to one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingFile { path }
            | Self::DataFormat { path, .. }
            | Self::FileAccess { path, .. }
            | Self::UnreadableBundle { path, .. } => Some(path),
            Self::RecordSkipped { .. } | Self::Cancelled => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }
}

/// Convenience alias for bundle analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(AnalysisError::missing("/b/x").kind(), "MissingFile");
        assert_eq!(
            AnalysisError::data_format("/b/x", "bad").kind(),
            "DataFormatError"
        );
        assert_eq!(AnalysisError::skipped(3, "bad").kind(), "RecordSkipped");
        assert_eq!(
            AnalysisError::file_access("/b/x", "denied").kind(),
            "FileAccessError"
        );
        assert_eq!(AnalysisError::Cancelled.kind(), "Cancelled");
    }

    #[test]
    fn not_found_io_maps_to_missing() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = AnalysisError::from_io("/b/errors.json", &err);
        assert!(mapped.is_missing());
        assert_eq!(mapped.path(), Some(Path::new("/b/errors.json")));
    }

    #[test]
    fn permission_io_maps_to_file_access() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped = AnalysisError::from_io("/b/errors.json", &err);
        assert_eq!(mapped.kind(), "FileAccessError");
        assert!(mapped.to_string().contains("denied"));
    }
}
