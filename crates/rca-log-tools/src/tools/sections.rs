use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::analysis::{
    correlator, error_stats, metadata, request_patterns, service_logs, timeline_stats,
};
use crate::config::AnalysisConfig;
use crate::report::Section;
use crate::source::BundleSource;
use crate::tools::BundleTool;

/// List the bundle; an unlistable bundle becomes the tool's failure document.
async fn list_bundle(source: &Arc<dyn BundleSource>, bundle: &Path) -> Result<Vec<String>, Value> {
    source
        .list_dir(bundle)
        .await
        .map_err(|e| Section::<()>::from_error(&e, bundle).to_json())
}

pub struct ExtractMetadata;

#[async_trait]
impl BundleTool for ExtractMetadata {
    fn name(&self) -> &str {
        "extract_metadata"
    }

    fn description(&self) -> &str {
        "Parse metadata.txt: scenario, collection time, namespace, file and error counts"
    }

    async fn run(
        &self,
        _: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        _: &AnalysisConfig,
    ) -> Value {
        if let Err(doc) = list_bundle(source, bundle).await {
            return doc;
        }
        metadata::extract(source.as_ref(), bundle).await.to_json()
    }
}

pub struct GetErrorStatistics;

#[async_trait]
impl BundleTool for GetErrorStatistics {
    fn name(&self) -> &str {
        "get_error_statistics"
    }

    fn description(&self) -> &str {
        "Error counts by category, service and severity, top signatures and histogram"
    }

    async fn run(
        &self,
        _: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        config: &AnalysisConfig,
    ) -> Value {
        if let Err(doc) = list_bundle(source, bundle).await {
            return doc;
        }
        error_stats::extract(source.as_ref(), bundle, config)
            .await
            .to_json()
    }
}

pub struct GetTimelineStatistics;

#[async_trait]
impl BundleTool for GetTimelineStatistics {
    fn name(&self) -> &str {
        "get_timeline_statistics"
    }

    fn description(&self) -> &str {
        "Timeline event counts, request ids, duration and event rate"
    }

    async fn run(
        &self,
        _: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        config: &AnalysisConfig,
    ) -> Value {
        if let Err(doc) = list_bundle(source, bundle).await {
            return doc;
        }
        timeline_stats::extract(source.as_ref(), bundle, config)
            .await
            .to_json()
    }
}

pub struct GetServiceStatistics;

#[async_trait]
impl BundleTool for GetServiceStatistics {
    fn name(&self) -> &str {
        "get_service_statistics"
    }

    fn description(&self) -> &str {
        "Per-service log entry, level, error, request and latency statistics"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "service": {
                    "type": "string",
                    "description": "Only report this service (e.g. \"api\" or \"service-api\")"
                }
            }
        })
    }

    async fn run(
        &self,
        args: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        _: &AnalysisConfig,
    ) -> Value {
        let service = args.get("service").and_then(|v| v.as_str());
        service_logs::extract(source, bundle, service).await.to_json()
    }
}

pub struct GetRequestPatterns;

#[async_trait]
impl BundleTool for GetRequestPatterns {
    fn name(&self) -> &str {
        "get_request_patterns"
    }

    fn description(&self) -> &str {
        "Request groups by service, endpoint and method, plus ranked failed requests"
    }

    async fn run(
        &self,
        _: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        config: &AnalysisConfig,
    ) -> Value {
        let names = match list_bundle(source, bundle).await {
            Ok(names) => names,
            Err(doc) => return doc,
        };
        let (logs, errors) = tokio::join!(
            service_logs::load(Arc::clone(source), bundle, &names),
            error_stats::load(source.as_ref(), bundle),
        );
        let records = errors.as_ref().map_or(&[][..], |p| p.records.as_slice());
        request_patterns::section(&logs, records, bundle, config).to_json()
    }
}

pub struct AnalyzeErrorPatterns;

#[async_trait]
impl BundleTool for AnalyzeErrorPatterns {
    fn name(&self) -> &str {
        "analyze_error_patterns"
    }

    fn description(&self) -> &str {
        "Cluster errors by signature, detect sequences, build the correlation graph and rank root-cause candidates"
    }

    async fn run(
        &self,
        _: &Value,
        bundle: &Path,
        source: &Arc<dyn BundleSource>,
        config: &AnalysisConfig,
    ) -> Value {
        let names = match list_bundle(source, bundle).await {
            Ok(names) => names,
            Err(doc) => return doc,
        };
        let (errors, logs) = tokio::join!(
            error_stats::load(source.as_ref(), bundle),
            service_logs::load(Arc::clone(source), bundle, &names),
        );
        correlator::section(&errors, &logs, bundle, config).to_json()
    }
}
