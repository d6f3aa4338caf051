//! Error pattern correlation: signature clustering, same-service sequences,
//! the cross-service correlation graph and root-cause ranking.
//!
//! Every stage iterates ordered maps and sorts with total tie-breaks, so the
//! output depends only on the set of input records, never on their order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::analysis::error_stats::time_order;
use crate::analysis::service_logs::{ParsedLogs, is_error_entry};
use crate::analysis::signature::{cluster_id, normalize};
use crate::config::{AnalysisConfig, RankingWeights};
use crate::error::AnalysisResult;
use crate::parsers::records::ParsedRecords;
use crate::report::Section;
use crate::types::{ErrorRecord, LogEntry, LogLevel, RecordOrigin};

// ── Categorization of log-derived errors ──────────────────────

/// First matching pattern wins.
static CATEGORY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("TIMEOUT", r"timeout|timed out|deadline exceeded"),
        ("CONNECTION", r"connection|network|socket|unreachable"),
        ("VALIDATION", r"validation|invalid|bad request"),
        ("AUTHENTICATION", r"\bauth|unauthorized|forbidden|permission"),
        ("RESOURCE", r"resource|not found|\b404\b|\b500\b|quota|no space"),
        ("DATABASE", r"database|\bdb\b|\bsql|query|deadlock"),
        ("MEMORY", r"memory|\boom|out of memory"),
        ("CRASH", r"crash|failed|terminated|panic|segfault"),
        ("NAME_ERROR", r"name.*not defined|undefined"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(&format!("(?i){pattern}")).unwrap()))
    .collect()
});

pub fn categorize(message: &str) -> &'static str {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map_or("UNKNOWN", |(name, _)| *name)
}

/// Lift error entries of service logs into error records.
pub fn log_error_records<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
) -> Vec<ErrorRecord> {
    entries
        .into_iter()
        .filter(|e| is_error_entry(e))
        .map(|e| ErrorRecord {
            timestamp: e.timestamp,
            service: e.service.clone(),
            category: categorize(&e.message).to_string(),
            severity: match e.level {
                Some(LogLevel::Critical) => "critical",
                Some(LogLevel::Error) => "high",
                _ => "medium",
            }
            .to_string(),
            message: e.message.clone(),
            request_id: e.request_id.clone(),
            origin: RecordOrigin::ServiceLog,
        })
        .collect()
}

// ── Clustering ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCluster {
    pub id: String,
    pub signature: String,
    /// Earliest member's message; ties go to the lexicographically smallest.
    pub representative_message: String,
    pub count: usize,
    pub services: Vec<String>,
    pub categories: Vec<String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Sum of member severity weights.
    pub severity_score: u32,
}

/// Group records by exact signature. Largest clusters first, then earliest,
/// then by signature.
pub fn cluster(records: &[ErrorRecord]) -> Vec<ErrorCluster> {
    let mut by_signature: BTreeMap<String, Vec<&ErrorRecord>> = BTreeMap::new();
    for rec in records {
        by_signature
            .entry(normalize(&rec.message))
            .or_default()
            .push(rec);
    }

    let mut clusters: Vec<ErrorCluster> = by_signature
        .into_iter()
        .map(|(signature, members)| {
            let representative = members
                .iter()
                .min_by(|a, b| {
                    time_order(a.timestamp, b.timestamp).then_with(|| a.message.cmp(&b.message))
                })
                .map(|r| r.message.clone())
                .unwrap_or_default();
            let services: BTreeSet<&str> = members.iter().map(|r| r.service.as_str()).collect();
            let categories: BTreeSet<&str> = members.iter().map(|r| r.category.as_str()).collect();
            ErrorCluster {
                id: cluster_id(&signature),
                representative_message: representative,
                count: members.len(),
                services: services.into_iter().map(String::from).collect(),
                categories: categories.into_iter().map(String::from).collect(),
                first_seen: members.iter().filter_map(|r| r.timestamp).min(),
                last_seen: members.iter().filter_map(|r| r.timestamp).max(),
                severity_score: members.iter().map(|r| r.severity_weight()).sum(),
                signature,
            }
        })
        .collect();

    clusters.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(time_order(a.first_seen, b.first_seen))
            .then_with(|| a.signature.cmp(&b.signature))
    });
    clusters
}

// ── Sequences ─────────────────────────────────────────────────

/// A same-service transition from one cluster to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSequence {
    pub from_cluster: String,
    pub to_cluster: String,
    pub from_signature: String,
    pub to_signature: String,
    pub count: usize,
    pub services: Vec<String>,
    pub min_gap_secs: f64,
    pub max_gap_secs: f64,
}

#[derive(Default)]
struct SequenceTally<'a> {
    count: usize,
    services: BTreeSet<&'a str>,
    min_gap_ms: Option<i64>,
    max_gap_ms: i64,
}

fn window_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)
}

/// Tally adjacent cluster transitions within each service. Records are
/// ordered by timestamp, then cluster id; untimed records do not take part.
pub fn detect_sequences(
    records: &[ErrorRecord],
    window_secs: u64,
    limit: usize,
) -> Vec<ErrorSequence> {
    let window = window_ms(window_secs);

    let mut per_service: BTreeMap<&str, Vec<(i64, String, String)>> = BTreeMap::new();
    for rec in records {
        if let Some(ts) = rec.timestamp {
            let signature = normalize(&rec.message);
            per_service.entry(rec.service.as_str()).or_default().push((
                ts.timestamp_millis(),
                cluster_id(&signature),
                signature,
            ));
        }
    }

    let mut tallies: BTreeMap<(String, String), (String, String, SequenceTally)> = BTreeMap::new();
    for (service, mut events) in per_service {
        events.sort();
        for pair in events.windows(2) {
            let (t1, from, from_sig) = &pair[0];
            let (t2, to, to_sig) = &pair[1];
            let gap = t2 - t1;
            if from == to || gap > window {
                continue;
            }
            let (_, _, tally) = tallies
                .entry((from.clone(), to.clone()))
                .or_insert_with(|| (from_sig.clone(), to_sig.clone(), SequenceTally::default()));
            tally.count += 1;
            tally.services.insert(service);
            tally.min_gap_ms = Some(tally.min_gap_ms.map_or(gap, |m| m.min(gap)));
            tally.max_gap_ms = tally.max_gap_ms.max(gap);
        }
    }

    let mut sequences: Vec<ErrorSequence> = tallies
        .into_iter()
        .map(|((from, to), (from_sig, to_sig, tally))| ErrorSequence {
            from_cluster: from,
            to_cluster: to,
            from_signature: from_sig,
            to_signature: to_sig,
            count: tally.count,
            services: tally.services.into_iter().map(String::from).collect(),
            min_gap_secs: tally.min_gap_ms.unwrap_or(0) as f64 / 1000.0,
            max_gap_secs: tally.max_gap_ms as f64 / 1000.0,
        })
        .collect();
    sequences.sort_by(|a, b| b.count.cmp(&a.count));
    sequences.truncate(limit);
    sequences
}

// ── Correlation graph ─────────────────────────────────────────

/// Directed edge `source → target` of the correlation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationEdge {
    pub source: String,
    pub target: String,
    /// Number of target errors preceded by a source error within the window.
    pub strength: usize,
}

/// Build the correlation graph over services.
///
/// For each ordered pair of distinct services (A, B), the strength is the
/// number of B errors at `t` for which some A error lies in `[t - window, t]`.
/// Both directions are evaluated independently, so cycles are kept.
pub fn correlation_edges(
    records: &[ErrorRecord],
    window_secs: u64,
    min_strength: usize,
) -> Vec<CorrelationEdge> {
    let window = window_ms(window_secs);

    let mut times: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for rec in records {
        if let Some(ts) = rec.timestamp {
            times
                .entry(rec.service.as_str())
                .or_default()
                .push(ts.timestamp_millis());
        }
    }
    for stamps in times.values_mut() {
        stamps.sort_unstable();
    }

    let mut edges = Vec::new();
    for (source, source_times) in &times {
        for (target, target_times) in &times {
            if source == target {
                continue;
            }
            let strength = target_times
                .iter()
                .filter(|&&t| {
                    let i = source_times.partition_point(|&s| s < t.saturating_sub(window));
                    source_times.get(i).is_some_and(|&s| s <= t)
                })
                .count();
            if strength >= min_strength.max(1) {
                edges.push(CorrelationEdge {
                    source: source.to_string(),
                    target: target.to_string(),
                    strength,
                });
            }
        }
    }
    edges.sort_by(|a, b| b.strength.cmp(&a.strength));
    edges
}

// ── Root-cause ranking ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCauseCandidate {
    pub service: String,
    pub score: f64,
    pub earliness: f64,
    pub fan_out: f64,
    pub severity: f64,
    pub error_count: usize,
    pub first_error: Option<DateTime<Utc>>,
    pub out_degree: usize,
    pub out_strength: usize,
    pub supporting_cluster_ids: Vec<String>,
    pub rationale_tags: Vec<&'static str>,
}

#[derive(Default)]
struct ServiceFacts {
    errors: usize,
    first_error: Option<DateTime<Utc>>,
    severity: u32,
    out_degree: usize,
    out_strength: usize,
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Score every service with errors and keep the best `config.top_candidates`.
///
/// Components, each in [0, 1]: earliness of the first error relative to the
/// other services, fan-out (half out-degree, half out-strength, both relative
/// to the maximum), and summed severity relative to the maximum.
pub fn rank_candidates(
    records: &[ErrorRecord],
    clusters: &[ErrorCluster],
    edges: &[CorrelationEdge],
    config: &AnalysisConfig,
) -> Vec<RootCauseCandidate> {
    let mut facts: BTreeMap<&str, ServiceFacts> = BTreeMap::new();
    for rec in records {
        let f = facts.entry(rec.service.as_str()).or_default();
        f.errors += 1;
        f.severity += rec.severity_weight();
        if let Some(ts) = rec.timestamp {
            f.first_error = Some(f.first_error.map_or(ts, |cur| cur.min(ts)));
        }
    }
    for edge in edges {
        if let Some(f) = facts.get_mut(edge.source.as_str()) {
            f.out_degree += 1;
            f.out_strength += edge.strength;
        }
    }

    let firsts: Vec<DateTime<Utc>> = facts.values().filter_map(|f| f.first_error).collect();
    let earliest = firsts.iter().min().copied();
    let latest = firsts.iter().max().copied();
    let max_degree = facts.values().map(|f| f.out_degree).max().unwrap_or(0);
    let max_strength = facts.values().map(|f| f.out_strength).max().unwrap_or(0);
    let max_severity = facts.values().map(|f| f.severity).max().unwrap_or(0);
    let max_errors = facts.values().map(|f| f.errors).max().unwrap_or(0);

    let RankingWeights {
        earliness: w_early,
        fan_out: w_fan,
        severity: w_sev,
    } = config.ranking;

    let mut candidates: Vec<RootCauseCandidate> = facts
        .iter()
        .map(|(&service, f)| {
            let earliness = match (f.first_error, earliest, latest) {
                (Some(first), Some(lo), Some(hi)) if hi > lo => {
                    (hi - first).num_milliseconds() as f64 / (hi - lo).num_milliseconds() as f64
                }
                (Some(_), _, _) => 1.0,
                _ => 0.0,
            };
            let fan_out = 0.5 * ratio(f.out_degree as f64, max_degree as f64)
                + 0.5 * ratio(f.out_strength as f64, max_strength as f64);
            let severity = ratio(f64::from(f.severity), f64::from(max_severity));

            let mut tags = Vec::new();
            if f.first_error.is_some() && f.first_error == earliest {
                tags.push("earliest observed");
            }
            if f.out_strength > 0 && f.out_strength == max_strength {
                tags.push("highest fan-out");
            }
            if f.severity == max_severity {
                tags.push("highest severity");
            }
            if f.errors == max_errors {
                tags.push("most errors");
            }

            RootCauseCandidate {
                service: service.to_string(),
                score: round4(w_early * earliness + w_fan * fan_out + w_sev * severity),
                earliness: round4(earliness),
                fan_out: round4(fan_out),
                severity: round4(severity),
                error_count: f.errors,
                first_error: f.first_error,
                out_degree: f.out_degree,
                out_strength: f.out_strength,
                supporting_cluster_ids: clusters
                    .iter()
                    .filter(|c| c.services.iter().any(|s| s == service))
                    .map(|c| c.id.clone())
                    .collect(),
                rationale_tags: tags,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.service.cmp(&b.service))
    });
    candidates.truncate(config.top_candidates);
    candidates
}

// ── Section ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPatterns {
    pub total_errors_analyzed: usize,
    pub errors_from_records: usize,
    pub errors_from_logs: usize,
    /// Records without a usable timestamp; clustered but not ordered.
    pub untimed_errors: usize,
    pub error_categories: BTreeMap<String, usize>,
    pub service_error_counts: BTreeMap<String, usize>,
    pub total_clusters: usize,
    pub clusters: Vec<ErrorCluster>,
    pub sequences: Vec<ErrorSequence>,
    pub correlation_edges: Vec<CorrelationEdge>,
    pub root_cause_candidates: Vec<RootCauseCandidate>,
}

/// Run the full correlation over a set of error records.
pub fn correlate(records: &[ErrorRecord], config: &AnalysisConfig) -> ErrorPatterns {
    let mut categories = BTreeMap::new();
    let mut per_service = BTreeMap::new();
    for rec in records {
        *categories.entry(rec.category.clone()).or_default() += 1;
        *per_service.entry(rec.service.clone()).or_default() += 1;
    }

    let mut clusters = cluster(records);
    let edges = correlation_edges(
        records,
        config.correlation_window_secs,
        config.min_edge_strength,
    );
    let candidates = rank_candidates(records, &clusters, &edges, config);
    let total_clusters = clusters.len();
    clusters.truncate(config.max_clusters);

    tracing::debug!(
        records = records.len(),
        clusters = total_clusters,
        edges = edges.len(),
        "error patterns correlated"
    );

    ErrorPatterns {
        total_errors_analyzed: records.len(),
        errors_from_records: records
            .iter()
            .filter(|r| r.origin == RecordOrigin::ErrorsFile)
            .count(),
        errors_from_logs: records
            .iter()
            .filter(|r| r.origin == RecordOrigin::ServiceLog)
            .count(),
        untimed_errors: records.iter().filter(|r| r.timestamp.is_none()).count(),
        error_categories: categories,
        service_error_counts: per_service,
        total_clusters,
        clusters,
        sequences: detect_sequences(records, config.sequence_window_secs, config.max_sequences),
        correlation_edges: edges,
        root_cause_candidates: candidates,
    }
}

/// Error patterns section from whatever error sources loaded.
///
/// Log-derived errors are merged in when enabled. The section fails with the
/// `errors.json` error only when there is nothing at all to correlate.
pub fn section(
    errors: &AnalysisResult<ParsedRecords<ErrorRecord>>,
    logs: &AnalysisResult<ParsedLogs>,
    bundle: &Path,
    config: &AnalysisConfig,
) -> Section<ErrorPatterns> {
    let mut input = Vec::new();
    if let Ok(parsed) = errors {
        input.extend(parsed.records.iter().cloned());
    }
    if config.include_log_errors
        && let Ok(parsed) = logs
    {
        input.extend(log_error_records(parsed.entries()));
    }
    match errors {
        Err(e) if input.is_empty() => Section::from_dependency_error(e, bundle, "error records"),
        _ => Section::Ok(correlate(&input, config)),
    }
}
