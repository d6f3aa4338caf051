//! Service and persistent log parsing with per-service aggregation.
//!
//! Files are read and parsed as independent tasks. Per-file results are
//! reduced into per-service accumulators; the reduction only sums counts and
//! concatenates samples, so the result does not depend on completion order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tokio::task::{self, JoinSet};

use crate::error::{AnalysisError, AnalysisResult};
use crate::parsers::{self, service_from_file_name};
use crate::report::Section;
use crate::source::BundleSource;
use crate::stats::{LatencySummary, percentage};
use crate::types::LogEntry;

/// Path reported when a bundle holds no service logs at all.
pub const SERVICE_LOG_GLOB: &str = "service-*.log";

static RE_ERROR_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(exception|traceback|panic(?:ked)?|failed|failure|timeout|timed out|refused|crash(?:ed)?|fatal|oomkilled)\b",
    )
    .unwrap()
});

/// Whether an entry counts as an error: error-level, or its message carries
/// one of the fixed error keywords.
pub fn is_error_entry(entry: &LogEntry) -> bool {
    entry.level.is_some_and(|l| l.is_error()) || RE_ERROR_KEYWORD.is_match(&entry.message)
}

/// Whether an entry describes a request.
pub fn is_request_entry(entry: &LogEntry) -> bool {
    entry.request_id.is_some() || entry.status_code.is_some()
}

/// A bundle file recognized as a service log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub file: String,
    pub service: String,
}

/// Pick service and persistent logs out of a directory listing, sorted by file name.
pub fn discover(file_names: &[String]) -> Vec<LogFile> {
    let mut files: Vec<LogFile> = file_names
        .iter()
        .filter_map(|name| {
            service_from_file_name(name).map(|service| LogFile {
                file: name.clone(),
                service,
            })
        })
        .collect();
    files.sort_by(|a, b| a.file.cmp(&b.file));
    files
}

/// Entries of one successfully read file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLogFile {
    pub file: String,
    pub service: String,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreadableFile {
    pub file: String,
    pub error: String,
    pub message: String,
}

/// All parsed service logs of a bundle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLogs {
    pub files: Vec<ParsedLogFile>,
    pub unreadable: Vec<UnreadableFile>,
}

impl ParsedLogs {
    /// All entries, ordered by file name then line.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.files.iter().flat_map(|f| f.entries.iter())
    }
}

/// Read and parse every service log in `file_names` concurrently.
///
/// Fails with `MissingFile` when there is no service log at all, and with the
/// first file's error when none of them could be read. Dropping the returned
/// future aborts the reads still in flight.
pub async fn load(
    source: Arc<dyn BundleSource>,
    bundle: &Path,
    file_names: &[String],
) -> AnalysisResult<ParsedLogs> {
    let files = discover(file_names);
    if files.is_empty() {
        return Err(AnalysisError::missing(bundle.join(SERVICE_LOG_GLOB)));
    }

    let mut tasks = JoinSet::new();
    let mut pending: HashMap<task::Id, LogFile> = HashMap::with_capacity(files.len());
    for log in files {
        let source = Arc::clone(&source);
        let path = bundle.join(&log.file);
        let service = log.service.clone();
        let handle = tasks.spawn(async move {
            let content = source.read_to_string(&path).await?;
            let entries = parsers::parse_file(&service, &content);
            tracing::debug!(
                path = %path.display(),
                entries = entries.len(),
                "parsed service log"
            );
            Ok::<_, AnalysisError>(entries)
        });
        pending.insert(handle.id(), log);
    }

    let mut outcomes = Vec::with_capacity(pending.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, result)) => (id, Ok(result)),
            Err(e) => (e.id(), Err(e)),
        };
        let Some(log) = pending.remove(&id) else {
            continue;
        };
        let result = outcome.unwrap_or_else(|e| {
            Err(AnalysisError::file_access(bundle.join(&log.file), e.to_string()))
        });
        outcomes.push((log, result));
    }
    // completion order is arbitrary
    outcomes.sort_by(|a, b| a.0.file.cmp(&b.0.file));

    let mut parsed = ParsedLogs::default();
    let mut first_error = None;
    for (log, result) in outcomes {
        match result {
            Ok(entries) => parsed.files.push(ParsedLogFile {
                file: log.file,
                service: log.service,
                entries,
            }),
            Err(e) => {
                tracing::warn!(file = %log.file, error = %e, "service log unreadable");
                parsed.unreadable.push(UnreadableFile {
                    file: log.file,
                    error: e.kind().to_string(),
                    message: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if parsed.files.is_empty() => Err(e),
        _ => Ok(parsed),
    }
}

/// Running per-service totals. `merge` is associative and commutative up to
/// the order of the sample vectors, which are sorted before summarizing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceAccumulator {
    files: BTreeSet<String>,
    entries: usize,
    unstructured: usize,
    levels: BTreeMap<String, usize>,
    errors: usize,
    requests: usize,
    latencies: Vec<f64>,
    durations: Vec<f64>,
}

impl ServiceAccumulator {
    pub fn from_file(file: &ParsedLogFile) -> Self {
        let mut acc = Self::default();
        acc.files.insert(file.file.clone());
        for entry in &file.entries {
            acc.entries += 1;
            if !entry.structured {
                acc.unstructured += 1;
            }
            let level = entry.level.map_or("unknown", |l| l.as_str());
            *acc.levels.entry(level.to_string()).or_default() += 1;
            if is_error_entry(entry) {
                acc.errors += 1;
            }
            if is_request_entry(entry) {
                acc.requests += 1;
            }
            acc.latencies.extend(entry.latency_ms);
            acc.durations.extend(entry.duration_ms);
        }
        acc
    }

    pub fn merge(&mut self, other: Self) {
        self.files.extend(other.files);
        self.entries += other.entries;
        self.unstructured += other.unstructured;
        for (level, n) in other.levels {
            *self.levels.entry(level).or_default() += n;
        }
        self.errors += other.errors;
        self.requests += other.requests;
        self.latencies.extend(other.latencies);
        self.durations.extend(other.durations);
    }

    pub fn summarize(&self) -> ServiceSummary {
        ServiceSummary {
            files: self.files.iter().cloned().collect(),
            total_entries: self.entries,
            unstructured_entries: self.unstructured,
            level_distribution: self.levels.clone(),
            error_count: self.errors,
            request_count: self.requests,
            error_rate: percentage(self.errors, self.entries),
            latency_ms: LatencySummary::from_samples(&self.latencies),
            duration_ms: LatencySummary::from_samples(&self.durations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub files: Vec<String>,
    pub total_entries: usize,
    pub unstructured_entries: usize,
    /// Keyed by level name; entries without a level count as `unknown`.
    pub level_distribution: BTreeMap<String, usize>,
    pub error_count: usize,
    pub request_count: usize,
    /// Errors as a percentage of entries.
    pub error_rate: f64,
    /// `latency_ms` samples; absent without samples.
    pub latency_ms: Option<LatencySummary>,
    /// `duration_ms` samples; absent without samples.
    pub duration_ms: Option<LatencySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub files_analyzed: usize,
    pub services_found: usize,
    pub total_entries: usize,
    pub total_errors: usize,
    pub total_requests: usize,
    pub services: BTreeMap<String, ServiceSummary>,
    pub unreadable_files: Vec<UnreadableFile>,
}

pub fn compute(parsed: &ParsedLogs) -> ServiceStats {
    let mut by_service: BTreeMap<&str, ServiceAccumulator> = BTreeMap::new();
    for file in &parsed.files {
        by_service
            .entry(file.service.as_str())
            .or_default()
            .merge(ServiceAccumulator::from_file(file));
    }

    let services: BTreeMap<String, ServiceSummary> = by_service
        .into_iter()
        .map(|(name, acc)| (name.to_string(), acc.summarize()))
        .collect();

    ServiceStats {
        files_analyzed: parsed.files.len(),
        services_found: services.len(),
        total_entries: services.values().map(|s| s.total_entries).sum(),
        total_errors: services.values().map(|s| s.error_count).sum(),
        total_requests: services.values().map(|s| s.request_count).sum(),
        services,
        unreadable_files: parsed.unreadable.clone(),
    }
}

/// Whether `service` is the identity `wanted` names. The `service-` prefix
/// is optional: `api` and `service-api` name the same service.
pub fn is_service(service: &str, wanted: &str) -> bool {
    service == wanted || service.strip_prefix("service-") == Some(wanted)
}

/// List the bundle and load its service logs, optionally only those of one
/// service.
pub async fn load_bundle(
    source: &Arc<dyn BundleSource>,
    bundle: &Path,
    service: Option<&str>,
) -> AnalysisResult<ParsedLogs> {
    let mut names = source.list_dir(bundle).await?;
    if let Some(wanted) = service {
        names.retain(|name| service_from_file_name(name).is_some_and(|s| is_service(&s, wanted)));
    }
    load(Arc::clone(source), bundle, &names).await
}

/// Service statistics section for the bundle, optionally for one service.
pub async fn extract(
    source: &Arc<dyn BundleSource>,
    bundle: &Path,
    service: Option<&str>,
) -> Section<ServiceStats> {
    match load_bundle(source, bundle, service).await {
        Ok(parsed) => Section::Ok(compute(&parsed)),
        Err(e) => Section::from_error(&e, bundle),
    }
}
