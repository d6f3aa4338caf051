//! Full-bundle analysis: runs every extractor and merges the sections.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::analysis::summary::{SummaryInputs, summarize};
use crate::analysis::{
    correlator, error_stats, metadata, request_patterns, service_logs, timeline_stats,
};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::report::{AnalysisReport, Section};
use crate::source::BundleSource;

/// Version stamped into every report.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs all extractors against one bundle and assembles the report.
///
/// Holds no state between runs; every call to [`analyze`](Self::analyze)
/// starts from the bundle files.
pub struct LogAnalysisOrchestrator {
    source: Arc<dyn BundleSource>,
    config: AnalysisConfig,
}

impl LogAnalysisOrchestrator {
    pub fn new(source: Arc<dyn BundleSource>, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze the bundle at `bundle`.
    ///
    /// Section failures are recorded in the report. The only errors returned
    /// are `UnreadableBundle` (the directory cannot be listed) and
    /// `Cancelled` (the token fired before the report was complete).
    pub async fn analyze(
        &self,
        bundle: &Path,
        generated_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> AnalysisResult<AnalysisReport> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let names = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            listed = self.source.list_dir(bundle) => listed?,
        };
        tracing::info!(bundle = %bundle.display(), files = names.len(), "analyzing bundle");

        let source = self.source.as_ref();
        let parse_stage = async {
            tokio::join!(
                metadata::load(source, bundle),
                error_stats::load(source, bundle),
                timeline_stats::load(source, bundle),
                service_logs::load(Arc::clone(&self.source), bundle, &names),
            )
        };
        let (meta, errors, timeline, logs) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(bundle = %bundle.display(), "analysis cancelled");
                return Err(AnalysisError::Cancelled);
            }
            loaded = parse_stage => loaded,
        };

        let config = &self.config;
        let metadata = to_section(&meta, bundle, Clone::clone);
        let error_stats = to_section(&errors, bundle, |p| error_stats::compute(p, config));
        let timeline_stats = to_section(&timeline, bundle, |p| timeline_stats::compute(p, config));
        let service_stats = to_section(&logs, bundle, service_logs::compute);

        let error_records = errors.as_ref().map_or(&[][..], |p| p.records.as_slice());
        let request_patterns = request_patterns::section(&logs, error_records, bundle, config);
        let error_patterns = correlator::section(&errors, &logs, bundle, config);

        if cancel.is_cancelled() {
            tracing::warn!(bundle = %bundle.display(), "analysis cancelled");
            return Err(AnalysisError::Cancelled);
        }

        let summary = Section::Ok(summarize(&SummaryInputs {
            metadata: &metadata,
            error_stats: &error_stats,
            timeline_stats: &timeline_stats,
            service_stats: &service_stats,
            request_patterns: &request_patterns,
            error_patterns: &error_patterns,
        }));

        let report = AnalysisReport {
            bundle_path: bundle.display().to_string(),
            generated_at,
            engine_version: ENGINE_VERSION,
            metadata,
            error_stats,
            timeline_stats,
            service_stats,
            request_patterns,
            error_patterns,
            summary,
        };

        for (section, status) in report.section_statuses() {
            if status != "OK" {
                tracing::warn!(section, status, "section degraded");
            }
        }
        tracing::info!(bundle = %bundle.display(), "analysis complete");
        Ok(report)
    }
}

fn to_section<T, U>(
    loaded: &AnalysisResult<T>,
    bundle: &Path,
    compute: impl FnOnce(&T) -> U,
) -> Section<U> {
    match loaded {
        Ok(value) => Section::Ok(compute(value)),
        Err(e) => Section::from_error(e, bundle),
    }
}
