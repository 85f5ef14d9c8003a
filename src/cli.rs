//! Command-line arguments for `multisearch-host`.

use std::path::PathBuf;

use crate::error::{HostError, Result};
use crate::session::SearchRequest;

pub const USAGE: &str = "usage: multisearch-host [--config PATH] [--more SOURCE] PATTERN";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostArgs {
    pub config: Option<PathBuf>,
    pub more: Option<String>,
    pub pattern: String,
}

impl HostArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// Everything after `--` is taken as the pattern, so patterns that start
    /// with a dash can still be searched. An absent pattern means the empty
    /// pattern.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Usage`] for unknown flags, missing flag values or
    /// more than one pattern.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = None;
        let mut more = None;
        let mut pattern: Option<String> = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config = Some(PathBuf::from(value(&mut args, "--config")?)),
                "--more" => more = Some(value(&mut args, "--more")?),
                "--" => {
                    let rest: Vec<String> = args.by_ref().collect();
                    set_pattern(&mut pattern, rest.join(" "))?;
                }
                flag if flag.starts_with("--") => {
                    return Err(HostError::Usage(format!("unknown flag {flag}")));
                }
                _ => set_pattern(&mut pattern, arg)?,
            }
        }

        Ok(Self {
            config,
            more,
            pattern: pattern.unwrap_or_default(),
        })
    }

    pub fn request(&self) -> SearchRequest {
        SearchRequest {
            pattern: self.pattern.clone(),
            more: self.more.clone(),
        }
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| HostError::Usage(format!("{flag} needs a value")))
}

fn set_pattern(slot: &mut Option<String>, pattern: String) -> Result<()> {
    if slot.is_some() {
        return Err(HostError::Usage("only one PATTERN is accepted".into()));
    }
    *slot = Some(pattern);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn parse(args: &[&str]) -> Result<HostArgs> {
        HostArgs::parse(args.iter().map(|a| (*a).to_string()))
    }

    #[test]
    fn pattern_only() {
        let args = parse(&["search"]).unwrap();
        assert_eq!(args.pattern, "search");
        assert!(args.config.is_none());
        assert!(args.more.is_none());
    }

    #[test]
    fn flags_and_pattern_in_any_order() {
        let args = parse(&["--more", "files", "sea", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(args.more.as_deref(), Some("files"));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(args.request().pattern, "sea");
    }

    #[test]
    fn double_dash_allows_dashed_patterns() {
        let args = parse(&["--", "--weird", "pattern"]).unwrap();
        assert_eq!(args.pattern, "--weird pattern");
    }

    #[test]
    fn missing_pattern_is_empty() {
        assert_eq!(parse(&[]).unwrap().pattern, "");
    }

    #[test]
    fn errors_are_usage_errors() {
        assert!(matches!(parse(&["--bogus"]), Err(HostError::Usage(_))));
        assert!(matches!(parse(&["--more"]), Err(HostError::Usage(_))));
        assert!(matches!(parse(&["a", "b"]), Err(HostError::Usage(_))));
    }
}
