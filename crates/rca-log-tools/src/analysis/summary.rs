//! Headline numbers across all sections.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::correlator::ErrorPatterns;
use crate::analysis::error_stats::ErrorStats;
use crate::analysis::metadata::Metadata;
use crate::analysis::request_patterns::RequestPatterns;
use crate::analysis::service_logs::ServiceStats;
use crate::analysis::timeline_stats::TimelineStats;
use crate::report::Section;
use crate::stats::round2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub collected_at: Option<String>,
    pub namespace: Option<String>,
    pub total_errors: usize,
    pub total_events: usize,
    pub services_affected: usize,
    pub total_requests: usize,
    /// Errors per hundred requests; absent without errors or requests.
    pub error_rate: Option<f64>,
    pub most_affected_service: Option<String>,
    pub primary_error_category: Option<String>,
    pub top_root_cause: Option<String>,
    /// Sections that did not complete.
    pub degraded_sections: Vec<&'static str>,
}

/// Sections the summary is built from.
pub struct SummaryInputs<'a> {
    pub metadata: &'a Section<Metadata>,
    pub error_stats: &'a Section<ErrorStats>,
    pub timeline_stats: &'a Section<TimelineStats>,
    pub service_stats: &'a Section<ServiceStats>,
    pub request_patterns: &'a Section<RequestPatterns>,
    pub error_patterns: &'a Section<ErrorPatterns>,
}

/// Key with the highest count; ties go to the smallest key.
fn top_key(counts: &BTreeMap<String, usize>) -> Option<String> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(k, _)| k.clone())
}

/// Build the summary. Failed sections contribute nothing.
pub fn summarize(inputs: &SummaryInputs<'_>) -> Summary {
    let metadata = inputs.metadata.ok();
    let errors = inputs.error_stats.ok();
    let total_errors = errors.map_or(0, |e| e.total_errors);
    let total_requests = inputs.request_patterns.ok().map_or(0, |r| r.total_requests);

    let degraded_sections = [
        ("metadata", inputs.metadata.is_ok()),
        ("error_stats", inputs.error_stats.is_ok()),
        ("timeline_stats", inputs.timeline_stats.is_ok()),
        ("service_stats", inputs.service_stats.is_ok()),
        ("request_patterns", inputs.request_patterns.is_ok()),
        ("error_patterns", inputs.error_patterns.is_ok()),
    ]
    .into_iter()
    .filter(|(_, ok)| !ok)
    .map(|(name, _)| name)
    .collect();

    Summary {
        scenario: metadata
            .and_then(|m| m.scenario_type.clone())
            .unwrap_or_else(|| "unknown".into()),
        collected_at: metadata.and_then(|m| m.collected_at.clone()),
        namespace: metadata.and_then(|m| m.namespace.clone()),
        total_errors,
        total_events: inputs.timeline_stats.ok().map_or(0, |t| t.total_events),
        services_affected: inputs.service_stats.ok().map_or(0, |s| s.services_found),
        total_requests,
        error_rate: (total_errors > 0 && total_requests > 0)
            .then(|| round2(total_errors as f64 / total_requests as f64 * 100.0)),
        most_affected_service: errors.and_then(|e| top_key(&e.errors_by_service)),
        primary_error_category: inputs
            .error_patterns
            .ok()
            .and_then(|p| top_key(&p.error_categories)),
        top_root_cause: inputs
            .error_patterns
            .ok()
            .and_then(|p| p.root_cause_candidates.first())
            .map(|c| c.service.clone()),
        degraded_sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metadata::parse_metadata;
    use crate::error::AnalysisError;
    use std::path::Path;

    fn unavailable<T>(file: &str) -> Section<T> {
        Section::from_error(&AnalysisError::missing(file), Path::new("/b"))
    }

    #[test]
    fn top_key_prefers_smallest_on_tie() {
        let counts: BTreeMap<String, usize> =
            [("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)].into();
        assert_eq!(top_key(&counts).as_deref(), Some("a"));
        assert_eq!(top_key(&BTreeMap::new()), None);
    }

    #[test]
    fn degraded_sections_contribute_nothing() {
        let metadata = Section::Ok(parse_metadata("scenario_type=oom\nnamespace=prod"));
        let summary = summarize(&SummaryInputs {
            metadata: &metadata,
            error_stats: &unavailable("/b/errors.json"),
            timeline_stats: &unavailable("/b/timeline.json"),
            service_stats: &unavailable("/b/service-*.log"),
            request_patterns: &unavailable("/b/service-*.log"),
            error_patterns: &unavailable("/b/errors.json"),
        });
        assert_eq!(summary.scenario, "oom");
        assert_eq!(summary.namespace.as_deref(), Some("prod"));
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.error_rate, None);
        assert_eq!(summary.top_root_cause, None);
        assert_eq!(summary.degraded_sections.len(), 5);
        assert!(!summary.degraded_sections.contains(&"metadata"));
    }

    #[test]
    fn unknown_scenario_without_metadata() {
        let summary = summarize(&SummaryInputs {
            metadata: &unavailable("/b/metadata.txt"),
            error_stats: &unavailable("/b/errors.json"),
            timeline_stats: &unavailable("/b/timeline.json"),
            service_stats: &unavailable("/b/service-*.log"),
            request_patterns: &unavailable("/b/service-*.log"),
            error_patterns: &unavailable("/b/errors.json"),
        });
        assert_eq!(summary.scenario, "unknown");
        assert_eq!(summary.degraded_sections[0], "metadata");
    }
}
