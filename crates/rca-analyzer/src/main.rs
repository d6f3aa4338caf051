//! RCA analyzer: runs the log bundle analysis engine against a bundle
//! directory and prints the JSON report on stdout.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rca_analyzer::args::CliArgs;
use rca_analyzer::config::AnalyzerConfig;
use rca_analyzer::output;
use rca_log_tools::{BundleSource, FileBundleSource, LogAnalysisOrchestrator, find_tool};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    // ── Load config ─────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bundle = %args.bundle.display(),
        "rca-analyzer starting"
    );

    let source: Arc<dyn BundleSource> = Arc::new(FileBundleSource);

    let mut status = ExitCode::SUCCESS;

    // ── Single section ──────────────────────────────────────────
    let document = if let Some(name) = &args.section {
        let tool = find_tool(name).with_context(|| format!("unknown section tool: {name}"))?;
        let tool_args = output::tool_args(args.service.as_deref());
        tool.run(&tool_args, &args.bundle, &source, &config.analysis).await
    } else {
        // ── Full report ─────────────────────────────────────────
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown signal received");
                    cancel.cancel();
                }
            });
        }

        let orchestrator = LogAnalysisOrchestrator::new(source, config.analysis.clone());
        match orchestrator
            .analyze(&args.bundle, chrono::Utc::now(), &cancel)
            .await
        {
            Ok(report) => report.to_json(),
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind(), "analysis failed");
                status = ExitCode::FAILURE;
                output::failure_document(&e, &args.bundle)
            }
        }
    };

    println!("{}", output::render(&document, config.pretty)?);

    tracing::info!("rca-analyzer finished");
    Ok(status)
}
