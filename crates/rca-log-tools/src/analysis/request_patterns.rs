//! Request and endpoint statistics derived from parsed service log entries.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::analysis::service_logs::ParsedLogs;
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::report::Section;
use crate::stats::{LatencySummary, percentage};
use crate::types::{ErrorRecord, LogEntry};

static RE_ENDPOINT_KV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:endpoint|path)=(/\S*)").unwrap());

static RE_METHOD_KV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmethod=([A-Za-z]+)\b").unwrap());

// GET /api/orders
static RE_HTTP_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\s+(/\S*)").unwrap()
});

const UNKNOWN_METHOD: &str = "UNKNOWN";

/// Endpoint and method named in a message, if any.
pub fn endpoint_and_method(message: &str) -> (Option<String>, Option<String>) {
    if let Some(c) = RE_HTTP_VERB.captures(message) {
        return (Some(c[2].to_string()), Some(c[1].to_string()));
    }
    let endpoint = RE_ENDPOINT_KV.captures(message).map(|c| c[1].to_string());
    let method = RE_METHOD_KV
        .captures(message)
        .map(|c| c[1].to_ascii_uppercase());
    (endpoint, method)
}

/// One request as seen across the log lines that mention it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestObservation {
    pub service: String,
    pub request_id: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub latency_ms: Option<f64>,
    /// Any member line was error-level.
    pub error_marked: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl RequestObservation {
    fn from_entry(entry: &LogEntry) -> Self {
        let (endpoint, method) = endpoint_and_method(&entry.message);
        Self {
            service: entry.service.clone(),
            request_id: entry.request_id.clone(),
            endpoint,
            method,
            status_code: entry.status_code,
            latency_ms: entry.effective_latency(),
            error_marked: entry.level.is_some_and(|l| l.is_error()),
            last_seen: entry.timestamp,
        }
    }

    /// Fold a later line of the same request into this observation.
    fn absorb(&mut self, other: Self) {
        self.endpoint = self.endpoint.take().or(other.endpoint);
        self.method = self.method.take().or(other.method);
        self.status_code = other.status_code.or(self.status_code);
        self.latency_ms = other.latency_ms.or(self.latency_ms);
        self.error_marked |= other.error_marked;
        self.last_seen = self.last_seen.max(other.last_seen);
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_none_or(|s| s < 400)
    }

    pub fn is_failed(&self) -> bool {
        !self.is_success() || self.error_marked
    }
}

/// Collapse request-bearing entries into observations. Lines sharing a
/// service and request id become one observation.
pub fn observations<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
) -> Vec<RequestObservation> {
    let mut by_id: BTreeMap<(String, String), RequestObservation> = BTreeMap::new();
    let mut anonymous = Vec::new();

    for entry in entries {
        let obs = RequestObservation::from_entry(entry);
        let is_request =
            obs.request_id.is_some() || obs.status_code.is_some() || obs.endpoint.is_some();
        if !is_request {
            continue;
        }
        match obs.request_id.clone() {
            Some(id) => {
                let key = (obs.service.clone(), id);
                match by_id.get_mut(&key) {
                    Some(existing) => existing.absorb(obs),
                    None => {
                        by_id.insert(key, obs);
                    }
                }
            }
            None => anonymous.push(obs),
        }
    }

    by_id.into_values().chain(anonymous).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestGroup {
    pub service: String,
    pub endpoint: String,
    pub method: String,
    pub count: usize,
    pub latency_ms: Option<LatencySummary>,
    pub status_distribution: BTreeMap<u16, usize>,
    /// Share of requests with a status below 400 or no status, in percent.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRequest {
    pub service: String,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub count: usize,
    pub last_seen: Option<DateTime<Utc>>,
    /// Error records sharing a request id with this group.
    pub related_error_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPatterns {
    pub total_requests: usize,
    pub requests_without_endpoint: usize,
    pub requests_by_service: BTreeMap<String, usize>,
    pub requests_by_method: BTreeMap<String, usize>,
    pub requests_by_endpoint: BTreeMap<String, usize>,
    pub status_distribution: BTreeMap<u16, usize>,
    pub latency_ms: Option<LatencySummary>,
    pub success_rate: f64,
    pub groups: Vec<RequestGroup>,
    pub failed_requests: Vec<FailedRequest>,
}

type GroupKey = (String, String, String);
type FailedKey = (String, Option<String>, Option<String>, Option<u16>);

pub fn analyze<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    errors: &[ErrorRecord],
    config: &AnalysisConfig,
) -> RequestPatterns {
    let observed = observations(entries);

    let mut by_service = BTreeMap::new();
    let mut by_method = BTreeMap::new();
    let mut by_endpoint = BTreeMap::new();
    let mut statuses = BTreeMap::new();
    let mut without_endpoint = 0;
    let mut grouped: BTreeMap<GroupKey, Vec<&RequestObservation>> = BTreeMap::new();

    for obs in &observed {
        *by_service.entry(obs.service.clone()).or_default() += 1;
        if let Some(method) = &obs.method {
            *by_method.entry(method.clone()).or_default() += 1;
        }
        if let Some(status) = obs.status_code {
            *statuses.entry(status).or_default() += 1;
        }
        match &obs.endpoint {
            Some(endpoint) => {
                *by_endpoint.entry(endpoint.clone()).or_default() += 1;
                let method = obs.method.as_deref().unwrap_or(UNKNOWN_METHOD);
                grouped
                    .entry((obs.service.clone(), endpoint.clone(), method.to_string()))
                    .or_default()
                    .push(obs);
            }
            None => without_endpoint += 1,
        }
    }

    let mut groups: Vec<RequestGroup> = grouped
        .into_iter()
        .map(|((service, endpoint, method), members)| {
            summarize_group(service, endpoint, method, &members)
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    let latencies: Vec<f64> = observed.iter().filter_map(|o| o.latency_ms).collect();
    let successes = observed.iter().filter(|o| o.is_success()).count();

    RequestPatterns {
        total_requests: observed.len(),
        requests_without_endpoint: without_endpoint,
        requests_by_service: by_service,
        requests_by_method: by_method,
        requests_by_endpoint: by_endpoint,
        status_distribution: statuses,
        latency_ms: LatencySummary::from_samples(&latencies),
        success_rate: percentage(successes, observed.len()),
        groups,
        failed_requests: failed_requests(&observed, errors, config.max_failed_requests),
    }
}

/// Request patterns section over loaded service logs; fails with the logs.
pub fn section(
    logs: &AnalysisResult<ParsedLogs>,
    errors: &[ErrorRecord],
    bundle: &Path,
    config: &AnalysisConfig,
) -> Section<RequestPatterns> {
    match logs {
        Ok(parsed) => Section::Ok(analyze(parsed.entries(), errors, config)),
        Err(e) => Section::from_dependency_error(e, bundle, "service logs"),
    }
}

fn summarize_group(
    service: String,
    endpoint: String,
    method: String,
    members: &[&RequestObservation],
) -> RequestGroup {
    let latencies: Vec<f64> = members.iter().filter_map(|o| o.latency_ms).collect();
    let mut status_distribution = BTreeMap::new();
    for status in members.iter().filter_map(|o| o.status_code) {
        *status_distribution.entry(status).or_default() += 1;
    }
    let successes = members.iter().filter(|o| o.is_success()).count();
    RequestGroup {
        service,
        endpoint,
        method,
        count: members.len(),
        latency_ms: LatencySummary::from_samples(&latencies),
        status_distribution,
        success_rate: percentage(successes, members.len()),
    }
}

/// Failed requests aggregated by service, endpoint, method and status;
/// most frequent first, then most recent.
fn failed_requests(
    observed: &[RequestObservation],
    errors: &[ErrorRecord],
    limit: usize,
) -> Vec<FailedRequest> {
    let mut grouped: BTreeMap<FailedKey, (usize, Option<DateTime<Utc>>, BTreeSet<&str>)> =
        BTreeMap::new();
    for obs in observed.iter().filter(|o| o.is_failed()) {
        let key = (
            obs.service.clone(),
            obs.endpoint.clone(),
            obs.method.clone(),
            obs.status_code,
        );
        let slot = grouped.entry(key).or_default();
        slot.0 += 1;
        slot.1 = slot.1.max(obs.last_seen);
        if let Some(id) = &obs.request_id {
            slot.2.insert(id.as_str());
        }
    }

    let mut failed: Vec<FailedRequest> = grouped
        .into_iter()
        .map(|((service, endpoint, method, status_code), (count, last_seen, ids))| {
            FailedRequest {
                related_error_records: errors
                    .iter()
                    .filter(|e| e.request_id.as_deref().is_some_and(|id| ids.contains(id)))
                    .count(),
                service,
                endpoint,
                method,
                status_code,
                count,
                last_seen,
            }
        })
        .collect();

    // stable sort keeps key order for full ties
    failed.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| recent_first(a.last_seen, b.last_seen))
    });
    failed.truncate(limit);
    failed
}

fn recent_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
