//! Coercion of `errors.json` and `timeline.json` into typed records.
//!
//! The root must be a JSON array; anything else is a `DataFormat` error for
//! the whole file. Individual elements that do not fit the record shape are
//! skipped and counted.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{AnalysisError, AnalysisResult};
use crate::parsers::timestamp::{from_epoch_secs, parse_timestamp};
use crate::types::{ErrorRecord, RecordOrigin, TimelineEvent};

type Object = Map<String, Value>;

/// Records coerced from one JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecords<T> {
    pub records: Vec<T>,
    /// Elements rejected because they did not fit the record shape.
    pub skipped: usize,
}

/// Parse the content of `errors.json`.
pub fn parse_error_records(
    path: &Path,
    content: &str,
) -> AnalysisResult<ParsedRecords<ErrorRecord>> {
    coerce_all(path, content, error_record)
}

/// Parse the content of `timeline.json`.
pub fn parse_timeline_events(
    path: &Path,
    content: &str,
) -> AnalysisResult<ParsedRecords<TimelineEvent>> {
    coerce_all(path, content, timeline_event)
}

fn coerce_all<T>(
    path: &Path,
    content: &str,
    coerce: fn(usize, &Object) -> AnalysisResult<T>,
) -> AnalysisResult<ParsedRecords<T>> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| AnalysisError::data_format(path, format!("invalid JSON: {e}")))?;
    let items = match root {
        Value::Array(items) => items,
        other => {
            return Err(AnalysisError::data_format(
                path,
                format!("expected a JSON array at the root, found {}", type_name(&other)),
            ));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (index, item) in items.iter().enumerate() {
        let result = match item.as_object() {
            Some(obj) => coerce(index, obj),
            None => Err(AnalysisError::skipped(
                index,
                format!("expected an object, found {}", type_name(item)),
            )),
        };
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "record skipped");
                skipped += 1;
            }
        }
    }
    Ok(ParsedRecords { records, skipped })
}

fn error_record(index: usize, obj: &Object) -> AnalysisResult<ErrorRecord> {
    Ok(ErrorRecord {
        timestamp: timestamp_field(index, obj)?,
        service: required_str(index, obj, "service")?,
        category: required_str(index, obj, "category")?,
        severity: required_str(index, obj, "severity")?,
        message: optional_str(index, obj, "message")?.unwrap_or_default(),
        request_id: request_id_field(index, obj)?,
        origin: RecordOrigin::ErrorsFile,
    })
}

fn timeline_event(index: usize, obj: &Object) -> AnalysisResult<TimelineEvent> {
    Ok(TimelineEvent {
        timestamp: timestamp_field(index, obj)?,
        service: required_str(index, obj, "service")?,
        level: required_str(index, obj, "level")?,
        request_id: request_id_field(index, obj)?,
        event_type: optional_str(index, obj, "event")?.unwrap_or_else(|| "log_entry".into()),
    })
}

/// `timestamp` (or its alias `time`): string or epoch number, unparseable → None.
fn timestamp_field(index: usize, obj: &Object) -> AnalysisResult<Option<DateTime<Utc>>> {
    let value = obj.get("timestamp").or_else(|| obj.get("time"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(parse_timestamp(s)),
        Some(Value::Number(n)) => Ok(n.as_f64().and_then(from_epoch_secs)),
        Some(other) => Err(AnalysisError::skipped(
            index,
            format!("`timestamp` has unsupported type {}", type_name(other)),
        )),
    }
}

fn request_id_field(index: usize, obj: &Object) -> AnalysisResult<Option<String>> {
    Ok(optional_str(index, obj, "request_id")?.filter(|id| !id.is_empty() && id != "-"))
}

fn required_str(index: usize, obj: &Object, key: &str) -> AnalysisResult<String> {
    match optional_str(index, obj, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(AnalysisError::skipped(index, format!("`{key}` is empty"))),
        None => Err(AnalysisError::skipped(index, format!("missing `{key}`"))),
    }
}

fn optional_str(index: usize, obj: &Object, key: &str) -> AnalysisResult<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(AnalysisError::skipped(
            index,
            format!("`{key}` has unsupported type {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("/b/errors.json")
    }

    #[test]
    fn parse_complete_error_record() {
        let content = r#"[{"timestamp":"2024-01-15T12:00:05Z","service":"svc-a","category":"timeout","severity":"high","message":"conn timeout","request_id":"r-1"}]"#;
        let parsed = parse_error_records(path(), content).unwrap();
        assert_eq!(parsed.skipped, 0);
        let rec = &parsed.records[0];
        assert_eq!(rec.service, "svc-a");
        assert_eq!(rec.category, "timeout");
        assert_eq!(rec.request_id.as_deref(), Some("r-1"));
        assert!(rec.timestamp.is_some());
        assert_eq!(rec.origin, RecordOrigin::ErrorsFile);
    }

    #[test]
    fn missing_timestamp_and_message_tolerated() {
        let content = r#"[{"service":"svc-a","category":"timeout","severity":"high"}]"#;
        let parsed = parse_error_records(path(), content).unwrap();
        assert_eq!(parsed.skipped, 0);
        assert!(parsed.records[0].timestamp.is_none());
        assert_eq!(parsed.records[0].message, "");
    }

    #[test]
    fn unparseable_timestamp_kept_as_none() {
        let content =
            r#"[{"timestamp":"T0","service":"a","category":"c","severity":"low","message":"m"}]"#;
        let parsed = parse_error_records(path(), content).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.records[0].timestamp.is_none());
    }

    #[test]
    fn time_alias_and_epoch_number() {
        let content =
            r#"[{"time":1705320005,"service":"a","category":"c","severity":"low","message":"m"}]"#;
        let parsed = parse_error_records(path(), content).unwrap();
        assert_eq!(
            parsed.records[0].timestamp.unwrap().to_rfc3339(),
            "2024-01-15T12:00:05+00:00"
        );
    }

    #[test]
    fn shape_violations_are_skipped() {
        let content = r#"[
            {"service":"a","category":"c","severity":"low","message":"ok"},
            "not an object",
            {"category":"c","severity":"low","message":"no service"},
            {"service":"a","category":["x"],"severity":"low"},
            {"service":"a","category":"c","severity":"low","timestamp":true},
            42
        ]"#;
        let parsed = parse_error_records(path(), content).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped, 5);
    }

    #[test]
    fn object_root_is_data_format_error() {
        let err = parse_error_records(path(), r#"{"errors":[]}"#).unwrap_err();
        assert_eq!(err.kind(), "DataFormatError");
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn invalid_json_is_data_format_error() {
        let err = parse_error_records(path(), "[{").unwrap_err();
        assert_eq!(err.kind(), "DataFormatError");
    }

    #[test]
    fn timeline_defaults_and_dash_request_id() {
        let content = r#"[
            {"timestamp":"2024-01-15T12:00:00Z","service":"api","level":"INFO","request_id":"-"},
            {"timestamp":"2024-01-15T12:00:01Z","service":"api","level":"ERROR","request_id":"r1","event":"request_failed"}
        ]"#;
        let parsed = parse_timeline_events(Path::new("/b/timeline.json"), content).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.records[0].request_id.is_none());
        assert_eq!(parsed.records[0].event_type, "log_entry");
        assert_eq!(parsed.records[1].event_type, "request_failed");
    }

    #[test]
    fn timeline_missing_level_skipped() {
        let content = r#"[{"timestamp":"2024-01-15T12:00:00Z","service":"api"}]"#;
        let parsed = parse_timeline_events(Path::new("/b/timeline.json"), content).unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.skipped, 1);
    }
}
