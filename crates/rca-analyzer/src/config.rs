//! Analyzer configuration, loadable from TOML.

use std::path::Path;

use rca_log_tools::AnalysisConfig;
use serde::Deserialize;

/// Top-level configuration for the analyzer binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Default tracing filter. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Pretty-print the report document.
    #[serde(default)]
    pub pretty: bool,
    /// Engine tunables.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            pretty: false,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
