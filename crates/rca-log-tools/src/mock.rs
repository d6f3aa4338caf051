//! Mock bundle source for testing: serves pre-loaded bundle files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AnalysisError, AnalysisResult};
use crate::source::BundleSource;

/// Directory of the bundle built by [`MockBundleSource::with_sample_bundle`].
pub const SAMPLE_BUNDLE: &str = "/bundle";

enum MockFile {
    Content(String),
    Unreadable(String),
}

/// A mock bundle source that serves pre-loaded content by path.
#[derive(Default)]
pub struct MockBundleSource {
    files: BTreeMap<PathBuf, MockFile>,
    dirs: BTreeSet<PathBuf>,
}

impl MockBundleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty bundle directory.
    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.insert(dir.into());
    }

    /// Add a file with the given content; its parent directory is registered too.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.insert(parent.to_path_buf());
        }
        self.files.insert(path, MockFile::Content(content.into()));
    }

    /// Add a file that is listed but fails to read (e.g. permission denied).
    pub fn add_unreadable(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.insert(parent.to_path_buf());
        }
        self.files.insert(path, MockFile::Unreadable(reason.into()));
    }

    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Create a mock with a complete sample bundle at [`SAMPLE_BUNDLE`].
    pub fn with_sample_bundle() -> Self {
        let dir = Path::new(SAMPLE_BUNDLE);
        let mut m = Self::new();
        m.add_file(
            dir.join("metadata.txt"),
            [
                "# RCA bundle metadata",
                "scenario_type=crash",
                "timestamp_utc=2024-01-15T12:05:00Z",
                "namespace=payments",
                "files_included=6",
                "errors_found=5",
                "timeline_events=6",
                "collector_version=1.4.2",
            ]
            .join("\n"),
        );
        m.add_file(
            dir.join("errors.json"),
            r#"[
  {"timestamp":"2024-01-15T12:00:00Z","service":"service-db","category":"DATABASE","severity":"critical","message":"connection pool exhausted after 30 attempts"},
  {"timestamp":"2024-01-15T12:00:04Z","service":"service-api","category":"TIMEOUT","severity":"high","message":"upstream timeout calling db-1 after 5000ms","request_id":"6f1c2a9e-1b7d-4c1e-9a51-2d0f7b3e8a10"},
  {"timestamp":"2024-01-15T12:00:09Z","service":"service-api","category":"TIMEOUT","severity":"high","message":"upstream timeout calling db-2 after 5000ms","request_id":"0b5e7d2c-3f4a-4e8b-8c6d-9a1b2c3d4e5f"},
  {"timestamp":"2024-01-15T12:00:12Z","service":"service-db","category":"DATABASE","severity":"critical","message":"connection pool exhausted after 31 attempts"},
  {"timestamp":"2024-01-15T12:00:20Z","service":"service-web","category":"CONNECTION","severity":"medium","message":"502 from service-api [req-7]"}
]"#,
        );
        m.add_file(
            dir.join("timeline.json"),
            r#"[
  {"timestamp":"2024-01-15T12:00:00Z","service":"service-db","level":"ERROR","event":"pool_exhausted"},
  {"timestamp":"2024-01-15T12:00:01Z","service":"service-api","level":"INFO","request_id":"6f1c2a9e-1b7d-4c1e-9a51-2d0f7b3e8a10"},
  {"timestamp":"2024-01-15T12:00:04Z","service":"service-api","level":"ERROR","request_id":"6f1c2a9e-1b7d-4c1e-9a51-2d0f7b3e8a10"},
  {"timestamp":"2024-01-15T12:00:09Z","service":"service-api","level":"ERROR","request_id":"0b5e7d2c-3f4a-4e8b-8c6d-9a1b2c3d4e5f"},
  {"timestamp":"2024-01-15T12:00:20Z","service":"service-web","level":"WARN","request_id":"-"},
  {"timestamp":"2024-01-15T12:02:00Z","service":"service-db","level":"INFO","event":"pool_recovered"}
]"#,
        );
        m.add_file(
            dir.join("service-api-current.log"),
            [
                "2024-01-15T12:00:01Z INFO [REQUEST_START] req=6f1c2a9e-1b7d-4c1e-9a51-2d0f7b3e8a10 endpoint=/api/orders method=POST",
                "2024-01-15T12:00:04Z ERROR [REQUEST_COMPLETE] req=6f1c2a9e-1b7d-4c1e-9a51-2d0f7b3e8a10 endpoint=/api/orders method=POST duration_ms=5003.2 status=504",
                "2024-01-15T12:00:06Z INFO GET /api/health status=200 latency_ms=3.1",
                "2024-01-15T12:00:07Z WARN retrying request to db",
                "    at com.example.Db.query(Db.java:42)",
                "INFO cache warmed",
            ]
            .join("\n"),
        );
        m.add_file(
            dir.join("service-db.log"),
            [
                "2024-01-15T12:00:00Z ERROR connection pool exhausted after 30 attempts",
                "2024-01-15T12:00:02Z INFO accepted connection from 10.0.0.7",
                "2024-01-15T12:00:12Z FATAL connection pool exhausted after 31 attempts",
            ]
            .join("\n"),
        );
        m.add_file(
            dir.join("persistent-worker.log"),
            [
                "2024-01-15T12:00:30Z job 42 picked up",
                "2024-01-15T12:00:31Z INFO [REQUEST_COMPLETE] req=9d8c7b6a-5f4e-4d3c-2b1a-0f9e8d7c6b5a endpoint=/jobs/sync method=PUT duration_ms=120.5 status=200",
            ]
            .join("\n"),
        );
        m
    }
}

#[async_trait]
impl BundleSource for MockBundleSource {
    async fn read_to_string(&self, path: &Path) -> AnalysisResult<String> {
        match self.files.get(path) {
            Some(MockFile::Content(content)) => Ok(content.clone()),
            Some(MockFile::Unreadable(reason)) => Err(AnalysisError::file_access(path, reason)),
            None => Err(AnalysisError::missing(path)),
        }
    }

    async fn list_dir(&self, dir: &Path) -> AnalysisResult<Vec<String>> {
        if !self.dirs.contains(dir) {
            return Err(AnalysisError::UnreadableBundle {
                path: dir.to_path_buf(),
                message: "no such directory".into(),
            });
        }
        Ok(self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_lists_sample_bundle() {
        let source = MockBundleSource::with_sample_bundle();
        let names = source.list_dir(Path::new(SAMPLE_BUNDLE)).await.unwrap();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"errors.json".to_string()));
        // BTreeMap keys keep listings sorted
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn mock_not_found() {
        let source = MockBundleSource::new();
        let err = source
            .read_to_string(Path::new("/nonexistent"))
            .await
            .unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn mock_unreadable() {
        let mut source = MockBundleSource::new();
        source.add_unreadable("/b/service-a.log", "permission denied");
        let err = source
            .read_to_string(Path::new("/b/service-a.log"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FileAccessError");
        // still listed
        let names = source.list_dir(Path::new("/b")).await.unwrap();
        assert_eq!(names, vec!["service-a.log".to_string()]);
    }

    #[tokio::test]
    async fn mock_unknown_dir() {
        let source = MockBundleSource::new();
        let err = source.list_dir(Path::new("/missing")).await.unwrap_err();
        assert_eq!(err.kind(), "UnreadableBundle");
    }
}
