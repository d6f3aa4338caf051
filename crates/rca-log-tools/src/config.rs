//! Tunable analysis constants, deserializable from a TOML `[analysis]` table.

use serde::{Deserialize, Serialize};

/// Configuration shared by all extractors and the correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of normalized messages in the top-error list.
    #[serde(default = "default_top_messages")]
    pub top_messages: usize,
    /// Histogram bucket width in seconds.
    #[serde(default = "default_bucket_width_secs")]
    pub bucket_width_secs: u64,
    /// Upper bound on histogram buckets; wider buckets are used past it.
    #[serde(default = "default_max_histogram_buckets")]
    pub max_histogram_buckets: usize,
    /// Number of request ids listed in the timeline's top-requests list.
    #[serde(default = "default_top_request_ids")]
    pub top_request_ids: usize,
    /// Window for same-service cluster transitions, in seconds.
    #[serde(default = "default_window_secs")]
    pub sequence_window_secs: u64,
    /// Window for cross-service precedence, in seconds.
    #[serde(default = "default_window_secs")]
    pub correlation_window_secs: u64,
    /// Edges weaker than this are dropped from the correlation graph.
    #[serde(default = "default_min_edge_strength")]
    pub min_edge_strength: usize,
    /// Number of root-cause candidates reported.
    #[serde(default = "default_top_candidates")]
    pub top_candidates: usize,
    #[serde(default = "default_max_failed_requests")]
    pub max_failed_requests: usize,
    #[serde(default = "default_max_sequences")]
    pub max_sequences: usize,
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    /// Feed error-level service log lines into the correlator.
    #[serde(default = "default_true")]
    pub include_log_errors: bool,
    #[serde(default)]
    pub ranking: RankingWeights,
}

/// Weights of the root-cause score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    #[serde(default = "default_earliness_weight")]
    pub earliness: f64,
    #[serde(default = "default_fan_out_weight")]
    pub fan_out: f64,
    #[serde(default = "default_severity_weight")]
    pub severity: f64,
}

fn default_top_messages() -> usize {
    10
}

fn default_bucket_width_secs() -> u64 {
    60
}

fn default_max_histogram_buckets() -> usize {
    1440
}

fn default_top_request_ids() -> usize {
    10
}

fn default_window_secs() -> u64 {
    30
}

fn default_min_edge_strength() -> usize {
    2
}

fn default_top_candidates() -> usize {
    5
}

fn default_max_failed_requests() -> usize {
    50
}

fn default_max_sequences() -> usize {
    20
}

fn default_max_clusters() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_earliness_weight() -> f64 {
    0.40
}

fn default_fan_out_weight() -> f64 {
    0.35
}

fn default_severity_weight() -> f64 {
    0.25
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            earliness: default_earliness_weight(),
            fan_out: default_fan_out_weight(),
            severity: default_severity_weight(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_messages: default_top_messages(),
            bucket_width_secs: default_bucket_width_secs(),
            max_histogram_buckets: default_max_histogram_buckets(),
            top_request_ids: default_top_request_ids(),
            sequence_window_secs: default_window_secs(),
            correlation_window_secs: default_window_secs(),
            min_edge_strength: default_min_edge_strength(),
            top_candidates: default_top_candidates(),
            max_failed_requests: default_max_failed_requests(),
            max_sequences: default_max_sequences(),
            max_clusters: default_max_clusters(),
            include_log_errors: default_true(),
            ranking: RankingWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.top_messages, 10);
        assert_eq!(config.bucket_width_secs, 60);
        assert_eq!(config.correlation_window_secs, 30);
        assert_eq!(config.sequence_window_secs, 30);
        assert_eq!(config.min_edge_strength, 2);
        assert_eq!(config.top_candidates, 5);
        assert!(config.include_log_errors);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn partial_override() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"min_edge_strength":1,"ranking":{"severity":0.5}}"#)
                .unwrap();
        assert_eq!(config.min_edge_strength, 1);
        assert_eq!(config.ranking.severity, 0.5);
        assert_eq!(config.ranking.earliness, 0.40);
        assert_eq!(config.top_messages, 10);
    }
}
