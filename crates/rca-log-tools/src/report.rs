//! Section results and the combined analysis report.
//!
//! Every extractor returns a [`Section`]: either its payload or a failure
//! record. Sections serialize to the documented JSON shapes:
//!
//! - ok: `{"status": "OK", ...payload}`
//! - unavailable: `{"status": "UNAVAILABLE", "error": "MissingFile", "message", "logs_path"}`
//! - failed: `{"status": "ERROR", "error": "<ErrorKind>", "message", "logs_path"}`

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::analysis::correlator::ErrorPatterns;
use crate::analysis::error_stats::ErrorStats;
use crate::analysis::metadata::Metadata;
use crate::analysis::request_patterns::RequestPatterns;
use crate::analysis::service_logs::ServiceStats;
use crate::analysis::summary::Summary;
use crate::analysis::timeline_stats::TimelineStats;
use crate::error::AnalysisError;

/// Why a section has no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionFailure {
    /// Error kind name (`MissingFile`, `DataFormatError`, ...).
    pub error: String,
    pub message: String,
    pub logs_path: String,
}

/// Outcome of one report section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ok(T),
    /// The input artifact is absent.
    Unavailable(SectionFailure),
    /// The input artifact exists but could not be used.
    Failed(SectionFailure),
}

impl<T> Section<T> {
    /// Build a failed section from an error. `fallback_path` is reported when
    /// the error is not tied to a specific file.
    pub fn from_error(err: &AnalysisError, fallback_path: &Path) -> Self {
        let failure = SectionFailure {
            error: err.kind().to_string(),
            message: err.to_string(),
            logs_path: err
                .path()
                .unwrap_or(fallback_path)
                .display()
                .to_string(),
        };
        if err.is_missing() {
            Self::Unavailable(failure)
        } else {
            Self::Failed(failure)
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok(_) => "OK",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Failed(_) => "ERROR",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Self::Ok(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SectionFailure> {
        match self {
            Self::Ok(_) => None,
            Self::Unavailable(f) | Self::Failed(f) => Some(f),
        }
    }

    /// Failed section of a consumer whose input `dependency` could not be loaded.
    pub fn from_dependency_error(err: &AnalysisError, fallback_path: &Path, dependency: &str) -> Self {
        let mut section = Self::from_error(err, fallback_path);
        if let Self::Unavailable(f) | Self::Failed(f) = &mut section {
            f.message = format!("{dependency} unavailable: {}", f.message);
        }
        section
    }
}

impl<T: Serialize> Section<T> {
    /// Serialize to a `serde_json::Value` document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "ERROR",
                "error": "SerializationError",
                "message": e.to_string(),
                "logs_path": "",
            })
        })
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, P: Serialize> {
            status: &'static str,
            #[serde(flatten)]
            payload: &'a P,
        }

        match self {
            Self::Ok(data) => Tagged {
                status: self.status(),
                payload: data,
            }
            .serialize(serializer),
            Self::Unavailable(f) | Self::Failed(f) => Tagged {
                status: self.status(),
                payload: f,
            }
            .serialize(serializer),
        }
    }
}

/// The combined analysis of one bundle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub bundle_path: String,
    pub generated_at: DateTime<Utc>,
    pub engine_version: &'static str,
    pub metadata: Section<Metadata>,
    pub error_stats: Section<ErrorStats>,
    pub timeline_stats: Section<TimelineStats>,
    pub service_stats: Section<ServiceStats>,
    pub request_patterns: Section<RequestPatterns>,
    pub error_patterns: Section<ErrorPatterns>,
    pub summary: Section<Summary>,
}

impl AnalysisReport {
    /// Section names paired with their status, in report order.
    pub fn section_statuses(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("metadata", self.metadata.status()),
            ("error_stats", self.error_stats.status()),
            ("timeline_stats", self.timeline_stats.status()),
            ("service_stats", self.service_stats.status()),
            ("request_patterns", self.request_patterns.status()),
            ("error_patterns", self.error_patterns.status()),
            ("summary", self.summary.status()),
        ]
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "error": "SerializationError",
                "message": e.to_string(),
                "logs_path": self.bundle_path,
            })
        })
    }
}
