//! Positional arguments: `rca-analyzer <bundle-dir> [config.toml] [section] [service]`.

use std::path::PathBuf;

use anyhow::{Context, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub bundle: PathBuf,
    pub config: Option<PathBuf>,
    /// Single section tool to run instead of the full report.
    pub section: Option<String>,
    /// Service filter for `get_service_statistics`.
    pub service: Option<String>,
}

impl CliArgs {
    /// Parse from an argument list that excludes the program name.
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let bundle = args
            .next()
            .map(PathBuf::from)
            .context("usage: rca-analyzer <bundle-dir> [config.toml] [section] [service]")?;
        // "-" skips the config file while still naming a section
        let config = args.next().filter(|c| c != "-").map(PathBuf::from);
        let section = args.next();
        let service = args.next();
        if args.next().is_some() {
            bail!("too many arguments");
        }
        Ok(Self {
            bundle,
            config,
            section,
            service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn bundle_only() {
        let args = parse(&["/tmp/bundle"]).unwrap();
        assert_eq!(args.bundle, PathBuf::from("/tmp/bundle"));
        assert!(args.config.is_none());
        assert!(args.section.is_none());
        assert!(args.service.is_none());
    }

    #[test]
    fn all_positionals() {
        let args = parse(&["/b", "rca.toml", "get_error_statistics"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("rca.toml")));
        assert_eq!(args.section.as_deref(), Some("get_error_statistics"));
    }

    #[test]
    fn dash_skips_config() {
        let args = parse(&["/b", "-", "extract_metadata"]).unwrap();
        assert!(args.config.is_none());
        assert_eq!(args.section.as_deref(), Some("extract_metadata"));
    }

    #[test]
    fn service_follows_section() {
        let args = parse(&["/b", "-", "get_service_statistics", "api"]).unwrap();
        assert_eq!(args.section.as_deref(), Some("get_service_statistics"));
        assert_eq!(args.service.as_deref(), Some("api"));
    }

    #[test]
    fn missing_bundle_is_error() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn extra_arguments_rejected() {
        assert!(parse(&["/b", "c.toml", "s", "api", "extra"]).is_err());
    }
}
