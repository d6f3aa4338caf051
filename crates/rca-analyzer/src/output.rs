//! JSON documents printed on stdout.

use std::path::Path;

use serde_json::Value;

use rca_log_tools::{AnalysisError, Section};

/// Document printed when the full analysis fails: the error kind, its
/// message and the offending path (the bundle when the error has none).
pub fn failure_document(err: &AnalysisError, bundle: &Path) -> Value {
    Section::<()>::from_error(err, bundle).to_json()
}

/// Arguments handed to a single section tool.
pub fn tool_args(service: Option<&str>) -> Value {
    match service {
        Some(service) => serde_json::json!({ "service": service }),
        None => Value::Null,
    }
}

pub fn render(document: &Value, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_bundle_document() {
        let err = AnalysisError::UnreadableBundle {
            path: "/data/bundle".into(),
            message: "permission denied".into(),
        };
        let doc = failure_document(&err, Path::new("/data/bundle"));
        assert_eq!(doc["status"], "ERROR");
        assert_eq!(doc["error"], "UnreadableBundle");
        assert_eq!(doc["logs_path"], "/data/bundle");
        assert!(doc["message"].as_str().unwrap().contains("permission denied"));
    }

    #[test]
    fn cancelled_document_falls_back_to_bundle() {
        let doc = failure_document(&AnalysisError::Cancelled, Path::new("/data/bundle"));
        assert_eq!(doc["error"], "Cancelled");
        assert_eq!(doc["message"], "analysis cancelled");
        assert_eq!(doc["logs_path"], "/data/bundle");
    }

    #[test]
    fn tool_args_carry_service() {
        assert_eq!(tool_args(None), Value::Null);
        assert_eq!(tool_args(Some("api"))["service"], "api");
    }

    #[test]
    fn compact_render_is_one_line() {
        let doc = serde_json::json!({ "a": [1, 2] });
        assert_eq!(render(&doc, false).unwrap(), r#"{"a":[1,2]}"#);
        assert!(render(&doc, true).unwrap().contains('\n'));
    }
}
