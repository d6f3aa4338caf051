//! RCA analyzer: library half of the command-line runner.
//!
//! Exposes config loading, argument parsing and output documents so they
//! can be tested without spawning the binary.

pub mod args;
pub mod config;
pub mod output;
