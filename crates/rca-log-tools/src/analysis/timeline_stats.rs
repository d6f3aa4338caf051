//! Timeline statistics over `timeline.json`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::parsers::records::{ParsedRecords, parse_timeline_events};
use crate::report::Section;
use crate::source::BundleSource;
use crate::stats::TimeHistogram;
use crate::types::TimelineEvent;

pub const TIMELINE_FILE: &str = "timeline.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestCount {
    pub request_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStats {
    pub total_events: usize,
    pub skipped_records: usize,
    pub events_by_service: BTreeMap<String, usize>,
    pub events_by_level: BTreeMap<String, usize>,
    pub events_by_type: BTreeMap<String, usize>,
    pub unique_requests: usize,
    pub top_request_ids: Vec<RequestCount>,
    /// Events carrying a request id, per service.
    pub request_distribution: BTreeMap<String, usize>,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
    /// Span between the first and last timed event; 0 with fewer than two.
    pub duration_seconds: f64,
    /// `None` when the duration is zero.
    pub event_rate_per_sec: Option<f64>,
    pub events_per_minute: Option<f64>,
    /// Timed events only.
    pub events_over_time: TimeHistogram,
}

/// Read and coerce `timeline.json`.
pub async fn load(
    source: &dyn BundleSource,
    bundle: &Path,
) -> AnalysisResult<ParsedRecords<TimelineEvent>> {
    let path = bundle.join(TIMELINE_FILE);
    let content = source.read_to_string(&path).await?;
    let parsed = parse_timeline_events(&path, &content)?;
    if parsed.skipped > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = parsed.skipped,
            "malformed timeline events skipped"
        );
    }
    Ok(parsed)
}

pub fn compute(parsed: &ParsedRecords<TimelineEvent>, config: &AnalysisConfig) -> TimelineStats {
    let events = &parsed.records;
    let mut by_service = BTreeMap::new();
    let mut by_level = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    let mut by_request: BTreeMap<&str, usize> = BTreeMap::new();
    let mut request_distribution = BTreeMap::new();

    for ev in events {
        *by_service.entry(ev.service.clone()).or_default() += 1;
        *by_level.entry(ev.level.clone()).or_default() += 1;
        *by_type.entry(ev.event_type.clone()).or_default() += 1;
        if let Some(id) = &ev.request_id {
            *by_request.entry(id.as_str()).or_default() += 1;
            *request_distribution.entry(ev.service.clone()).or_default() += 1;
        }
    }

    let unique_requests = by_request.len();
    let mut top_request_ids: Vec<RequestCount> = by_request
        .into_iter()
        .map(|(id, count)| RequestCount {
            request_id: id.to_string(),
            count,
        })
        .collect();
    // stable sort keeps ascending id order among equal counts
    top_request_ids.sort_by(|a, b| b.count.cmp(&a.count));
    top_request_ids.truncate(config.top_request_ids);

    let timestamps: Vec<DateTime<Utc>> = events.iter().filter_map(|e| e.timestamp).collect();
    let first_event = timestamps.iter().min().copied();
    let last_event = timestamps.iter().max().copied();
    let duration_seconds = match (first_event, last_event) {
        (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    };
    let event_rate_per_sec =
        (duration_seconds > 0.0).then(|| events.len() as f64 / duration_seconds);

    TimelineStats {
        total_events: events.len(),
        skipped_records: parsed.skipped,
        events_by_service: by_service,
        events_by_level: by_level,
        events_by_type: by_type,
        unique_requests,
        top_request_ids,
        request_distribution,
        first_event,
        last_event,
        duration_seconds,
        event_rate_per_sec,
        events_per_minute: event_rate_per_sec.map(|r| r * 60.0),
        events_over_time: TimeHistogram::build(
            &timestamps,
            config.bucket_width_secs,
            config.max_histogram_buckets,
        ),
    }
}

pub async fn extract(
    source: &dyn BundleSource,
    bundle: &Path,
    config: &AnalysisConfig,
) -> Section<TimelineStats> {
    match load(source, bundle).await {
        Ok(parsed) => Section::Ok(compute(&parsed, config)),
        Err(e) => Section::from_error(&e, bundle),
    }
}
