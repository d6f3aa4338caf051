//! Per-section extractors and the error pattern correlator.
//!
//! Parsing-stage extractors (`metadata`, `error_stats`, `timeline_stats`,
//! `service_logs`) read one artifact each. `request_patterns` and
//! `correlator` consume their parsed records; `summary` reads finished
//! sections only.

pub mod correlator;
pub mod error_stats;
pub mod metadata;
pub mod request_patterns;
pub mod service_logs;
pub mod signature;
pub mod summary;
pub mod timeline_stats;
