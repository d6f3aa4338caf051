//! Bundle metadata (`metadata.txt`) extraction.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::AnalysisResult;
use crate::report::Section;
use crate::source::BundleSource;

pub const METADATA_FILE: &str = "metadata.txt";

const SCENARIO_KEYS: &[&str] = &["scenario_type", "scenario"];
const COLLECTED_AT_KEYS: &[&str] = &["timestamp_utc", "collected_at"];
const NAMESPACE_KEYS: &[&str] = &["namespace"];
const FILE_COUNT_KEYS: &[&str] = &["files_included", "file_count"];
const ERROR_COUNT_KEYS: &[&str] = &["errors_found", "error_count"];
const TIMELINE_EVENT_KEYS: &[&str] = &["timeline_events"];

/// Key/value metadata with the recognized fields lifted out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub scenario_type: Option<String>,
    pub collected_at: Option<String>,
    pub namespace: Option<String>,
    pub file_count: Option<u64>,
    pub error_count: Option<u64>,
    pub timeline_events: Option<u64>,
    /// Non-comment lines without a usable `key=value` split.
    pub malformed_lines: usize,
    /// Every key as written in the file (last assignment wins).
    pub all_metadata: BTreeMap<String, String>,
}

/// Parse `key=value` lines. Blank and `#` lines are ignored; lines without
/// `=` or with an empty key are counted as malformed.
pub fn parse_metadata(content: &str) -> Metadata {
    let mut all = BTreeMap::new();
    let mut malformed_lines = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                all.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                tracing::debug!(line, "malformed metadata line");
                malformed_lines += 1;
            }
        }
    }

    // first alias with a usable value wins
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| all.get(*k).filter(|v| !v.is_empty()))
            .cloned()
    };
    let number = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| all.get(*k).and_then(|v| v.parse::<u64>().ok()))
    };

    Metadata {
        scenario_type: text(SCENARIO_KEYS),
        collected_at: text(COLLECTED_AT_KEYS),
        namespace: text(NAMESPACE_KEYS),
        file_count: number(FILE_COUNT_KEYS),
        error_count: number(ERROR_COUNT_KEYS),
        timeline_events: number(TIMELINE_EVENT_KEYS),
        malformed_lines,
        all_metadata: all,
    }
}

/// Read and parse the bundle's metadata file.
pub async fn load(source: &dyn BundleSource, bundle: &Path) -> AnalysisResult<Metadata> {
    let path = bundle.join(METADATA_FILE);
    let content = source.read_to_string(&path).await?;
    let metadata = parse_metadata(&content);
    if metadata.malformed_lines > 0 {
        tracing::warn!(
            path = %path.display(),
            malformed = metadata.malformed_lines,
            "metadata contains malformed lines"
        );
    }
    Ok(metadata)
}

/// Metadata section; an absent file yields an unavailable section.
pub async fn extract(source: &dyn BundleSource, bundle: &Path) -> Section<Metadata> {
    match load(source, bundle).await {
        Ok(metadata) => Section::Ok(metadata),
        Err(e) => Section::from_error(&e, bundle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBundleSource, SAMPLE_BUNDLE};

    #[test]
    fn recognized_fields_and_raw_keys() {
        let m = parse_metadata(
            "# header\nscenario_type=crash\nnamespace = payments\nfiles_included=6\nowner=sre=team\n",
        );
        assert_eq!(m.scenario_type.as_deref(), Some("crash"));
        assert_eq!(m.namespace.as_deref(), Some("payments"));
        assert_eq!(m.file_count, Some(6));
        assert_eq!(m.error_count, None);
        // split on the first '='
        assert_eq!(m.all_metadata["owner"], "sre=team");
        assert_eq!(m.all_metadata.len(), 4);
        assert_eq!(m.malformed_lines, 0);
    }

    #[test]
    fn short_aliases() {
        let m = parse_metadata("scenario=oom\ncollected_at=2024-01-15T12:05:00Z\nerror_count=3");
        assert_eq!(m.scenario_type.as_deref(), Some("oom"));
        assert_eq!(m.collected_at.as_deref(), Some("2024-01-15T12:05:00Z"));
        assert_eq!(m.error_count, Some(3));
    }

    #[test]
    fn malformed_lines_counted_not_fatal() {
        let m = parse_metadata("just text\n=novalue\nnamespace=prod\n\n");
        assert_eq!(m.malformed_lines, 2);
        assert_eq!(m.namespace.as_deref(), Some("prod"));
    }

    #[test]
    fn non_numeric_count_is_none() {
        let m = parse_metadata("files_included=many");
        assert_eq!(m.file_count, None);
        assert_eq!(m.all_metadata["files_included"], "many");
    }

    #[test]
    fn empty_alias_falls_through_to_next() {
        let m = parse_metadata("scenario_type=\nscenario=crash\nfiles_included=\nfile_count=4");
        assert_eq!(m.scenario_type.as_deref(), Some("crash"));
        assert_eq!(m.file_count, Some(4));
        assert_eq!(m.all_metadata["scenario_type"], "");
    }

    #[tokio::test]
    async fn extract_sample() {
        let source = MockBundleSource::with_sample_bundle();
        let section = extract(&source, Path::new(SAMPLE_BUNDLE)).await;
        let m = section.ok().unwrap();
        assert_eq!(m.scenario_type.as_deref(), Some("crash"));
        assert_eq!(m.timeline_events, Some(6));
        assert_eq!(m.all_metadata["collector_version"], "1.4.2");
    }

    #[tokio::test]
    async fn absent_file_is_unavailable() {
        let mut source = MockBundleSource::with_sample_bundle();
        source.remove_file(Path::new(SAMPLE_BUNDLE).join(METADATA_FILE));
        let section = extract(&source, Path::new(SAMPLE_BUNDLE)).await;
        assert_eq!(section.status(), "UNAVAILABLE");
        assert_eq!(section.to_json()["error"], "MissingFile");
    }
}
