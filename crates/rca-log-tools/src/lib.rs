//! Log bundle analysis engine for Kubernetes incident bundles.
//!
//! Reads a collected bundle directory (`metadata.txt`, `errors.json`,
//! `timeline.json`, `service-*.log`), computes six independent report
//! sections and a summary, and correlates errors across services to rank
//! likely root-cause services. A `BundleSource` abstraction keeps every
//! extractor testable against in-memory bundles.

pub mod analysis;
pub mod config;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod parsers;
pub mod report;
pub mod source;
pub mod stats;
pub mod tools;
pub mod types;

// Re-export key types for convenience
pub use config::{AnalysisConfig, RankingWeights};
pub use error::{AnalysisError, AnalysisResult};
pub use mock::{MockBundleSource, SAMPLE_BUNDLE};
pub use orchestrator::{ENGINE_VERSION, LogAnalysisOrchestrator};
pub use report::{AnalysisReport, Section, SectionFailure};
pub use source::{BundleSource, FileBundleSource};
pub use tools::{BundleTool, all_tools, find_tool};
pub use types::{ErrorRecord, LogEntry, LogLevel, TimelineEvent};
