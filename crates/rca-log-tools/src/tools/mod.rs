//! Single-section operations exposed as named tools.
//!
//! - extract_metadata: bundle metadata key/values and derived fields
//! - get_error_statistics: counts, top signatures and histogram of `errors.json`
//! - get_timeline_statistics: counts, request ids and event rate of `timeline.json`
//! - get_service_statistics: per-service log statistics
//! - get_request_patterns: endpoint groups and failed requests
//! - analyze_error_patterns: clusters, sequences, correlation graph and candidates

mod sections;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AnalysisConfig;
use crate::source::BundleSource;

pub use sections::{
    AnalyzeErrorPatterns, ExtractMetadata, GetErrorStatistics, GetRequestPatterns,
    GetServiceStatistics, GetTimelineStatistics,
};

/// One report section computed on its own.
///
/// `run` never fails: problems are reported in the returned section
/// document, which has the same shape as the section in the full report.
#[async_trait]
pub trait BundleTool: Send + Sync {
    /// Tool name (e.g., "get_error_statistics").
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema of the tool's optional arguments.
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn run(
        &self,
        args: &serde_json::Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        config: &AnalysisConfig,
    ) -> serde_json::Value;
}

/// Every section tool, in report order.
pub fn all_tools() -> Vec<Box<dyn BundleTool>> {
    vec![
        Box::new(ExtractMetadata),
        Box::new(GetErrorStatistics),
        Box::new(GetTimelineStatistics),
        Box::new(GetServiceStatistics),
        Box::new(GetRequestPatterns),
        Box::new(AnalyzeErrorPatterns),
    ]
}

/// Look up a tool by name.
pub fn find_tool(name: &str) -> Option<Box<dyn BundleTool>> {
    all_tools().into_iter().find(|t| t.name() == name)
}
