//! Core record types shared by every extractor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Log Level ─────────────────────────────────────────────────

/// Log level, ordered from least to most severe.
///
/// Variant declaration order matters: `#[derive(Ord)]` uses it,
/// so Debug < Info < Notice < Warning < Error < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Parse a level token as written in log lines (`ERROR`, `warn`, `FATAL`...).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "trace" | "debug" => Some(Self::Debug),
            "info" | "information" => Some(Self::Info),
            "notice" => Some(Self::Notice),
            "warn" | "warning" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            "critical" | "crit" | "fatal" | "panic" | "alert" | "emerg" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Error or worse.
    pub fn is_error(&self) -> bool {
        *self >= Self::Error
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Line Format ───────────────────────────────────────────────

/// Which line matcher produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    /// Timestamp, level, message carrying `status=` and a latency field.
    TimestampedRequest,
    /// Timestamp, level, message.
    Timestamped,
    /// Level and message without a timestamp.
    Leveled,
    /// Timestamp followed by free text, no level token.
    TimestampedText,
    /// Nothing matched; the raw line is kept verbatim.
    Unstructured,
}

// ── Log Entry ─────────────────────────────────────────────────

/// A parsed line from a service or persistent log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Parsed timestamp (None if absent or unparseable).
    pub timestamp: Option<DateTime<Utc>>,
    /// Service identity, derived from the file name.
    pub service: String,
    pub level: Option<LogLevel>,
    /// Message body, or the raw line for unstructured entries.
    pub message: String,
    /// `latency_ms=` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// `duration_ms=` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// False when no line matcher accepted the line.
    pub structured: bool,
    pub format: LineFormat,
    /// 1-based line number in the source file.
    pub line_number: usize,
}

impl LogEntry {
    /// Latency if reported, otherwise the request duration.
    pub fn effective_latency(&self) -> Option<f64> {
        self.latency_ms.or(self.duration_ms)
    }
}

// ── Error Record ──────────────────────────────────────────────

/// Where an error record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// An element of `errors.json`.
    ErrorsFile,
    /// An error-level line from a service log.
    ServiceLog,
}

/// One structured error, from `errors.json` or lifted from a service log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub service: String,
    pub category: String,
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub origin: RecordOrigin,
}

impl ErrorRecord {
    /// Numeric weight of the record's severity label, used for ranking.
    pub fn severity_weight(&self) -> u32 {
        severity_weight(&self.severity)
    }
}

/// Weight of a free-form severity label; unknown labels weigh 1.
pub fn severity_weight(label: &str) -> u32 {
    match label.to_ascii_lowercase().as_str() {
        "critical" | "fatal" | "emergency" | "blocker" | "p0" => 4,
        "high" | "error" | "major" | "severe" | "p1" => 3,
        "medium" | "moderate" | "warning" | "warn" | "p2" => 2,
        _ => 1,
    }
}

// ── Timeline Event ────────────────────────────────────────────

/// One element of `timeline.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub service: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Event type (`event` field); `log_entry` when absent.
    pub event_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tokens() {
        assert_eq!(LogLevel::from_token("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_token("Warn"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_token("FATAL"), Some(LogLevel::Critical));
        assert_eq!(LogLevel::from_token("trace"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_token("verbose"), None);
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Critical.is_error());
        assert!(LogLevel::Error.is_error());
        assert!(!LogLevel::Warning.is_error());
        assert!(LogLevel::Debug < LogLevel::Info);
    }

    #[test]
    fn severity_weights() {
        assert_eq!(severity_weight("CRITICAL"), 4);
        assert_eq!(severity_weight("high"), 3);
        assert_eq!(severity_weight("medium"), 2);
        assert_eq!(severity_weight("low"), 1);
        assert_eq!(severity_weight("whatever"), 1);
    }
}
