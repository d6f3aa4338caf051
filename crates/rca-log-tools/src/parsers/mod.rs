//! Service log line parsing and JSON record coercion.
//!
//! Each log line is tried against an ordered list of line formats; the first
//! format that matches wins. A line nothing matches is kept verbatim as an
//! unstructured entry.

pub mod records;
pub mod timestamp;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::{LineFormat, LogEntry, LogLevel};

const TS: &str = r"\[?(?P<ts>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\]?";
const LEVEL: &str =
    r"\[?(?P<level>(?i:TRACE|DEBUG|INFO|NOTICE|WARNING|WARN|ERROR|ERR|FATAL|CRITICAL|CRIT|PANIC))\]?:?";

// 2024-01-15T12:00:05Z ERROR message
static RE_TIMESTAMPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^{TS}\s+{LEVEL}\s+(?P<msg>.*\S)\s*$")).unwrap());

// ERROR message
static RE_LEVELED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^{LEVEL}\s+(?P<msg>.*\S)\s*$")).unwrap());

// 2024-01-15T12:00:05Z message
static RE_TIMESTAMPED_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^{TS}\s+(?P<msg>.*\S)\s*$")).unwrap());

static RE_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bstatus=(\d{3})\b").unwrap());

static RE_LATENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blatency_ms=(\d+(?:\.\d+)?)").unwrap());

static RE_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bduration_ms=(\d+(?:\.\d+)?)").unwrap());

static RE_REQUEST_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:req|request_id)=([A-Za-z0-9][A-Za-z0-9._\-]*)").unwrap()
});

/// Line formats in the order they are tried.
pub const MATCH_ORDER: [LineFormat; 4] = [
    LineFormat::TimestampedRequest,
    LineFormat::Timestamped,
    LineFormat::Leveled,
    LineFormat::TimestampedText,
];

/// Fields captured by a successful format match.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatch<'a> {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<LogLevel>,
    pub message: &'a str,
}

/// Try one line format against a line.
pub fn try_match(format: LineFormat, line: &str) -> Option<LineMatch<'_>> {
    match format {
        LineFormat::TimestampedRequest => {
            let m = match_timestamped(line)?;
            let is_request = RE_STATUS.is_match(m.message)
                && (RE_LATENCY.is_match(m.message) || RE_DURATION.is_match(m.message));
            is_request.then_some(m)
        }
        LineFormat::Timestamped => match_timestamped(line),
        LineFormat::Leveled => {
            let caps = RE_LEVELED.captures(line)?;
            Some(LineMatch {
                timestamp: None,
                level: LogLevel::from_token(caps.name("level")?.as_str()),
                message: caps.name("msg")?.as_str(),
            })
        }
        LineFormat::TimestampedText => {
            let caps = RE_TIMESTAMPED_TEXT.captures(line)?;
            Some(LineMatch {
                timestamp: timestamp::parse_timestamp(caps.name("ts")?.as_str()),
                level: None,
                message: caps.name("msg")?.as_str(),
            })
        }
        LineFormat::Unstructured => None,
    }
}

fn match_timestamped(line: &str) -> Option<LineMatch<'_>> {
    let caps = RE_TIMESTAMPED.captures(line)?;
    Some(LineMatch {
        timestamp: timestamp::parse_timestamp(caps.name("ts")?.as_str()),
        level: LogLevel::from_token(caps.name("level")?.as_str()),
        message: caps.name("msg")?.as_str(),
    })
}

/// Parse a single line into a log entry. Never fails: unmatched lines come
/// back with `structured == false` and the raw text as message.
pub fn parse_line(service: &str, line: &str, line_number: usize) -> LogEntry {
    let matched = MATCH_ORDER
        .iter()
        .find_map(|&format| try_match(format, line).map(|m| (format, m)));

    match matched {
        Some((format, m)) => LogEntry {
            timestamp: m.timestamp,
            service: service.to_string(),
            level: m.level,
            message: m.message.to_string(),
            latency_ms: capture_f64(&RE_LATENCY, m.message),
            duration_ms: capture_f64(&RE_DURATION, m.message),
            status_code: RE_STATUS
                .captures(m.message)
                .and_then(|c| c[1].parse().ok()),
            request_id: RE_REQUEST_ID
                .captures(m.message)
                .map(|c| c[1].to_string()),
            structured: true,
            format,
            line_number,
        },
        None => LogEntry {
            timestamp: None,
            service: service.to_string(),
            level: None,
            message: line.to_string(),
            latency_ms: None,
            duration_ms: None,
            status_code: None,
            request_id: None,
            structured: false,
            format: LineFormat::Unstructured,
            line_number,
        },
    }
}

/// Parse a whole log file. Blank lines are skipped; line numbers are 1-based.
pub fn parse_file(service: &str, content: &str) -> Vec<LogEntry> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, line)| parse_line(service, line, i + 1))
        .collect()
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

/// Derive the service identity from a bundle file name.
///
/// `service-api-current.log`, `service-api-previous.log` and
/// `persistent-api.log` all map to `service-api`. Returns `None` for files
/// that are not service or persistent logs.
pub fn service_from_file_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".log")?;
    let bare = match stem.strip_prefix("service-") {
        Some(rest) => rest,
        None => {
            let rest = stem.strip_prefix("persistent-")?;
            rest.strip_prefix("service-").unwrap_or(rest)
        }
    };
    let bare = bare
        .strip_suffix("-current")
        .or_else(|| bare.strip_suffix("-previous"))
        .unwrap_or(bare);
    (!bare.is_empty()).then(|| format!("service-{bare}"))
}
