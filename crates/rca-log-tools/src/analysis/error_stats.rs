//! Error statistics over `errors.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::signature;
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::parsers::records::{ParsedRecords, parse_error_records};
use crate::report::Section;
use crate::source::BundleSource;
use crate::stats::TimeHistogram;
use crate::types::ErrorRecord;

pub const ERRORS_FILE: &str = "errors.json";

/// One entry of the most-frequent-messages list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMessage {
    pub signature: String,
    /// Message of the earliest record carrying this signature.
    pub example: String,
    pub count: usize,
    pub first_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTimeRange {
    pub first_error: Option<DateTime<Utc>>,
    pub last_error: Option<DateTime<Utc>>,
    /// Records with a usable timestamp.
    pub timed_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub skipped_records: usize,
    pub errors_by_category: BTreeMap<String, usize>,
    pub errors_by_service: BTreeMap<String, usize>,
    pub errors_by_severity: BTreeMap<String, usize>,
    pub unique_requests_with_errors: usize,
    pub top_error_messages: Vec<TopMessage>,
    pub errors_over_time: TimeHistogram,
    pub timeline_summary: ErrorTimeRange,
}

/// Read and coerce `errors.json`.
pub async fn load(
    source: &dyn BundleSource,
    bundle: &Path,
) -> AnalysisResult<ParsedRecords<ErrorRecord>> {
    let path = bundle.join(ERRORS_FILE);
    let content = source.read_to_string(&path).await?;
    let parsed = parse_error_records(&path, &content)?;
    if parsed.skipped > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = parsed.skipped,
            "malformed error records skipped"
        );
    }
    Ok(parsed)
}

/// Compute error statistics over already-parsed records.
pub fn compute(parsed: &ParsedRecords<ErrorRecord>, config: &AnalysisConfig) -> ErrorStats {
    let records = &parsed.records;
    let mut by_category = BTreeMap::new();
    let mut by_service = BTreeMap::new();
    let mut by_severity = BTreeMap::new();
    let mut requests = BTreeSet::new();

    for rec in records {
        *by_category.entry(rec.category.clone()).or_default() += 1;
        *by_service.entry(rec.service.clone()).or_default() += 1;
        *by_severity.entry(rec.severity.clone()).or_default() += 1;
        if let Some(id) = &rec.request_id {
            requests.insert(id.as_str());
        }
    }

    let timestamps: Vec<DateTime<Utc>> = records.iter().filter_map(|r| r.timestamp).collect();

    ErrorStats {
        total_errors: records.len(),
        skipped_records: parsed.skipped,
        errors_by_category: by_category,
        errors_by_service: by_service,
        errors_by_severity: by_severity,
        unique_requests_with_errors: requests.len(),
        top_error_messages: top_messages(records, config.top_messages),
        errors_over_time: TimeHistogram::build(
            &timestamps,
            config.bucket_width_secs,
            config.max_histogram_buckets,
        ),
        timeline_summary: ErrorTimeRange {
            first_error: timestamps.iter().min().copied(),
            last_error: timestamps.iter().max().copied(),
            timed_errors: timestamps.len(),
        },
    }
}

/// Most frequent signatures; ties go to the earlier first occurrence, then
/// to the signature text.
pub fn top_messages(records: &[ErrorRecord], limit: usize) -> Vec<TopMessage> {
    let mut groups: BTreeMap<String, Vec<&ErrorRecord>> = BTreeMap::new();
    for rec in records {
        groups
            .entry(signature::normalize(&rec.message))
            .or_default()
            .push(rec);
    }

    let mut top: Vec<TopMessage> = groups
        .into_iter()
        .map(|(sig, members)| {
            let earliest = members
                .iter()
                .min_by(|a, b| time_order(a.timestamp, b.timestamp).then(a.message.cmp(&b.message)));
            TopMessage {
                example: earliest.map(|r| r.message.clone()).unwrap_or_default(),
                first_seen: members.iter().filter_map(|r| r.timestamp).min(),
                count: members.len(),
                signature: sig,
            }
        })
        .collect();

    top.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(time_order(a.first_seen, b.first_seen))
            .then_with(|| a.signature.cmp(&b.signature))
    });
    top.truncate(limit);
    top
}

/// Ascending time order with missing timestamps last.
pub fn time_order(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Error statistics section.
pub async fn extract(
    source: &dyn BundleSource,
    bundle: &Path,
    config: &AnalysisConfig,
) -> Section<ErrorStats> {
    match load(source, bundle).await {
        Ok(parsed) => Section::Ok(compute(&parsed, config)),
        Err(e) => Section::from_error(&e, bundle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBundleSource, SAMPLE_BUNDLE};

    fn parse(content: &str) -> ParsedRecords<ErrorRecord> {
        parse_error_records(Path::new("/b/errors.json"), content).unwrap()
    }

    #[test]
    fn similar_messages_rank_first() {
        let parsed = parse(
            r#"[
            {"timestamp":"2024-01-15T12:00:00Z","service":"svc-a","category":"timeout","severity":"high","message":"conn timeout to db-1"},
            {"timestamp":"2024-01-15T12:00:10Z","service":"svc-a","category":"timeout","severity":"high","message":"conn timeout to db-2"}
        ]"#,
        );
        let stats = compute(&parsed, &AnalysisConfig::default());
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.top_error_messages.len(), 1);
        let top = &stats.top_error_messages[0];
        assert_eq!(top.signature, "conn timeout to db-<n>");
        assert_eq!(top.count, 2);
        assert_eq!(top.example, "conn timeout to db-1");
    }

    #[tokio::test]
    async fn category_and_service_sums_equal_total() {
        let source = MockBundleSource::with_sample_bundle();
        let parsed = load(&source, Path::new(SAMPLE_BUNDLE)).await.unwrap();
        let stats = compute(&parsed, &AnalysisConfig::default());
        let by_cat: usize = stats.errors_by_category.values().sum();
        let by_svc: usize = stats.errors_by_service.values().sum();
        assert_eq!(by_cat, stats.total_errors);
        assert_eq!(by_svc, stats.total_errors);
        assert_eq!(stats.total_errors, 5);
        assert_eq!(stats.unique_requests_with_errors, 2);
    }

    #[test]
    fn top_ties_break_on_first_seen_then_text() {
        let parsed = parse(
            r#"[
            {"timestamp":"2024-01-15T12:00:09Z","service":"a","category":"c","severity":"low","message":"zeta"},
            {"timestamp":"2024-01-15T12:00:05Z","service":"a","category":"c","severity":"low","message":"omega"},
            {"service":"a","category":"c","severity":"low","message":"alpha"},
            {"service":"a","category":"c","severity":"low","message":"beta"}
        ]"#,
        );
        let top = top_messages(&parsed.records, 10);
        let order: Vec<&str> = top.iter().map(|t| t.signature.as_str()).collect();
        assert_eq!(order, vec!["omega", "zeta", "alpha", "beta"]);
        assert_eq!(top_messages(&parsed.records, 2).len(), 2);
    }

    #[test]
    fn untimed_records_counted_but_not_bucketed() {
        let parsed = parse(
            r#"[
            {"timestamp":"2024-01-15T12:00:00Z","service":"a","category":"c","severity":"low","message":"m"},
            {"timestamp":"garbage","service":"a","category":"c","severity":"low","message":"m"}
        ]"#,
        );
        let stats = compute(&parsed, &AnalysisConfig::default());
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.timeline_summary.timed_errors, 1);
        let bucketed: usize = stats.errors_over_time.buckets.iter().map(|b| b.count).sum();
        assert_eq!(bucketed, 1);
    }

    #[test]
    fn empty_array_is_ok() {
        let stats = compute(&parse("[]"), &AnalysisConfig::default());
        assert_eq!(stats.total_errors, 0);
        assert!(stats.top_error_messages.is_empty());
        assert!(stats.errors_over_time.buckets.is_empty());
        assert!(stats.timeline_summary.first_error.is_none());
    }

    #[tokio::test]
    async fn object_root_section_error() {
        let mut source = MockBundleSource::new();
        source.add_file("/b/errors.json", r#"{"errors": []}"#);
        let section = extract(&source, Path::new("/b"), &AnalysisConfig::default()).await;
        assert_eq!(section.status(), "ERROR");
        let json = section.to_json();
        assert_eq!(json["error"], "DataFormatError");
        assert_eq!(json["logs_path"], "/b/errors.json");
    }

    #[tokio::test]
    async fn skipped_records_reported() {
        let mut source = MockBundleSource::new();
        source.add_file(
            "/b/errors.json",
            r#"[{"service":"a","category":"c","severity":"low","message":"m"}, 7]"#,
        );
        let section = extract(&source, Path::new("/b"), &AnalysisConfig::default()).await;
        let stats = section.ok().unwrap();
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.skipped_records, 1);
    }
}
