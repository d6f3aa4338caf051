//! Shared harness for E2E tests.
//!
//! Writes bundles into temporary directories and runs the real
//! `FileBundleSource` against them, so every test goes through the same
//! file access, parsing and report assembly as a production run.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use rca_log_tools::{
    AnalysisConfig, AnalysisResult, BundleSource, FileBundleSource, LogAnalysisOrchestrator,
    find_tool,
};

/// Fixed report time so repeated runs serialize identically.
pub fn generated_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T13:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Timestamp `secs` seconds after 2024-01-15T12:00:00Z, RFC 3339.
pub fn ts(secs: i64) -> String {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    (base + chrono::Duration::seconds(secs))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// One `errors.json` record.
pub fn error_record(secs: i64, service: &str, category: &str, severity: &str, message: &str) -> Value {
    serde_json::json!({
        "timestamp": ts(secs),
        "service": service,
        "category": category,
        "severity": severity,
        "message": message,
    })
}

/// A bundle directory on disk, removed on drop.
pub struct Bundle {
    dir: TempDir,
}

impl Bundle {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// A bundle with every artifact type: metadata, errors, timeline, and
    /// current, previous and persistent service logs.
    pub fn sample() -> Self {
        let b = Self::empty();
        b.write(
            "metadata.txt",
            "# collected by rca-collector\n\
             scenario_type=crash\n\
             timestamp_utc=2024-01-15T12:05:00Z\n\
             namespace=payments\n\
             files_included=7\n\
             errors_found=6\n\
             timeline_events=5\n\
             this line has no separator\n",
        );
        b.write_errors(&[
            error_record(0, "service-db", "DATABASE", "critical", "connection pool exhausted after 30 attempts"),
            error_record(3, "service-api", "TIMEOUT", "high", "upstream timeout calling db-1 after 5000ms"),
            error_record(8, "service-api", "TIMEOUT", "high", "upstream timeout calling db-2 after 5000ms"),
            error_record(12, "service-db", "DATABASE", "critical", "connection pool exhausted after 31 attempts"),
            error_record(15, "service-api", "TIMEOUT", "high", "upstream timeout calling db-1 after 5000ms"),
            error_record(25, "service-web", "CONNECTION", "medium", "502 from service-api"),
        ]);
        b.write(
            "timeline.json",
            &serde_json::json!([
                {"timestamp": ts(0), "service": "service-db", "level": "ERROR", "event": "pool_exhausted"},
                {"timestamp": ts(2), "service": "service-api", "level": "INFO", "request_id": "req-1"},
                {"timestamp": ts(3), "service": "service-api", "level": "ERROR", "request_id": "req-1"},
                {"timestamp": ts(8), "service": "service-api", "level": "ERROR", "request_id": "req-2"},
                {"timestamp": ts(120), "service": "service-db", "level": "INFO", "event": "pool_recovered"},
            ])
            .to_string(),
        );
        b.write(
            "service-api-current.log",
            &[
                format!("{} INFO [REQUEST_START] req=req-1 endpoint=/api/orders method=POST", ts(2)),
                format!("{} ERROR [REQUEST_COMPLETE] req=req-1 endpoint=/api/orders method=POST duration_ms=5003.2 status=504", ts(3)),
                format!("{} ERROR [REQUEST_COMPLETE] req=req-2 endpoint=/api/orders method=POST duration_ms=5001.0 status=504", ts(8)),
                format!("{} INFO GET /api/health status=200 latency_ms=3.1", ts(9)),
                format!("{} INFO GET /api/health status=200 latency_ms=4.7", ts(10)),
                "    at com.example.Db.query(Db.java:42)".to_string(),
            ]
            .join("\n"),
        );
        b.write(
            "service-api-previous.log",
            &format!("{} INFO GET /api/health status=200 latency_ms=2.5", ts(-60)),
        );
        b.write(
            "service-db.log",
            &[
                format!("{} ERROR connection pool exhausted after 30 attempts", ts(0)),
                format!("{} INFO accepted connection from 10.0.0.7", ts(1)),
                format!("{} FATAL connection pool exhausted after 31 attempts", ts(12)),
            ]
            .join("\n"),
        );
        b.write(
            "persistent-worker.log",
            &format!("{} INFO [REQUEST_COMPLETE] req=job-9 endpoint=/jobs/sync method=PUT duration_ms=120.5 status=200", ts(30)),
        );
        b
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).unwrap();
    }

    pub fn write_errors(&self, records: &[Value]) {
        self.write("errors.json", &Value::Array(records.to_vec()).to_string());
    }

    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.dir.path().join(name)).unwrap();
    }

    /// Full report as a JSON value.
    pub async fn analyze(&self) -> Value {
        self.analyze_with(AnalysisConfig::default()).await
    }

    pub async fn analyze_with(&self, config: AnalysisConfig) -> Value {
        run_analysis(self.path(), config).await.unwrap().to_json()
    }

    /// Run one named section tool.
    pub async fn tool(&self, name: &str) -> Value {
        run_tool(self.path(), name, &AnalysisConfig::default()).await
    }
}

pub async fn run_analysis(
    bundle: &Path,
    config: AnalysisConfig,
) -> AnalysisResult<rca_log_tools::AnalysisReport> {
    let orchestrator = LogAnalysisOrchestrator::new(Arc::new(FileBundleSource), config);
    orchestrator
        .analyze(bundle, generated_at(), &CancellationToken::new())
        .await
}

pub async fn run_tool(bundle: &Path, name: &str, config: &AnalysisConfig) -> Value {
    let source: Arc<dyn BundleSource> = Arc::new(FileBundleSource);
    let tool = find_tool(name).unwrap();
    tool.run(&Value::Null, bundle, &source, config).await
}

/// Sum of the integer values of a JSON object.
pub fn sum_counts(map: &Value) -> u64 {
    map.as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum()
}
