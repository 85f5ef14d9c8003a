//! Host configuration: engine settings, listener pipeline and catalog sources.
//!
//! Loaded from TOML. A missing file falls back to [`HostConfig::default`],
//! which ships a small demo catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use multisearch_core::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};

/// Which decorator sits between the engine and the event output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerMode {
    /// Every event is written as soon as it is dispatched.
    Direct,
    /// Add/remove bursts are coalesced on the engine's throttle delay.
    #[default]
    Throttled,
    /// Output is held until every fast source has filled up or finished.
    WaitForSources,
}

/// One in-memory catalog searched by substring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Contributor id; unique across sources.
    pub id: String,
    /// Searchable entries.
    pub entries: Vec<String>,
    /// Maximum results kept for this source.
    pub limit: usize,
    pub sort_weight: i32,
    /// List every entry when the pattern is empty.
    pub supports_empty_pattern: bool,
    /// Not waited for by the wait-for-sources pipeline.
    pub slow: bool,
    /// Artificial delay before each entry is examined.
    pub item_delay_ms: u64,
    /// Command prefix stripped from the pattern, e.g. `">"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_prefix: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            entries: Vec::new(),
            limit: 10,
            sort_weight: 0,
            supports_empty_pattern: false,
            slow: false,
            item_delay_ms: 0,
            control_prefix: None,
        }
    }
}

/// Complete host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub listener: ListenerMode,
    /// Drop case-insensitive duplicate entries across sources.
    pub dedup: bool,
    pub search: SearchConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            listener: ListenerMode::default(),
            dedup: true,
            search: SearchConfig::default(),
            sources: demo_sources(),
        }
    }
}

fn entries(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn demo_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "files".into(),
            entries: entries(&[
                "Cargo.toml",
                "README.md",
                "src/main.rs",
                "src/search.rs",
                "src/searcher.rs",
                "tests/search_integration.rs",
            ]),
            limit: 5,
            sort_weight: 10,
            ..SourceConfig::default()
        },
        SourceConfig {
            id: "symbols".into(),
            entries: entries(&["Searcher", "SearchHandle", "search", "main", "Readme"]),
            limit: 5,
            sort_weight: 20,
            ..SourceConfig::default()
        },
        SourceConfig {
            id: "actions".into(),
            entries: entries(&["Search Everywhere", "Find in Files", "Reformat Code"]),
            limit: 3,
            sort_weight: 5,
            supports_empty_pattern: true,
            control_prefix: Some(">".into()),
            ..SourceConfig::default()
        },
        SourceConfig {
            id: "recent".into(),
            entries: entries(&["src/search.rs", "notes/search-ideas.md", "README.md"]),
            limit: 3,
            sort_weight: 1,
            slow: true,
            item_delay_ms: 50,
            ..SourceConfig::default()
        },
    ]
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/multisearch/config.toml`.
    ///
    /// `MULTISEARCH_CONFIG_DIR` overrides the directory.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("MULTISEARCH_CONFIG_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        dirs::config_dir()
            .map(|d| d.join("multisearch"))
            .unwrap_or_else(|| PathBuf::from("/tmp/multisearch-config"))
            .join("config.toml")
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path cannot be loaded, or if the
    /// loaded configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_config_path();
                if default.is_file() {
                    tracing::debug!(path = %default.display(), "loading default config");
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] for an empty, duplicated or zero-limit
    /// source, and [`HostError::Search`] for invalid engine settings.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.sources.is_empty() {
            return Err(HostError::Config("at least one source is required".into()));
        }
        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(HostError::Config("source id must not be empty".into()));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(HostError::Config(format!(
                    "duplicate source id: {}",
                    source.id
                )));
            }
            if source.limit == 0 {
                return Err(HostError::Config(format!(
                    "source {} limit must be greater than 0",
                    source.id
                )));
            }
        }
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|source| source.id == id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HostConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.dedup);
        assert_eq!(config.listener, ListenerMode::Throttled);
        assert!(config.sources.iter().any(|s| s.slow));
    }

    #[test]
    fn duplicate_source_rejected() {
        let mut config = HostConfig::default();
        config.sources.push(config.sources[0].clone());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate source id"));
    }

    #[test]
    fn zero_limit_rejected() {
        let mut config = HostConfig::default();
        config.sources[0].limit = 0;
        assert!(matches!(config.validate(), Err(HostError::Config(_))));
    }

    #[test]
    fn empty_sources_rejected() {
        let config = HostConfig {
            sources: Vec::new(),
            ..HostConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_engine_settings_surface_as_search_error() {
        let mut config = HostConfig::default();
        config.search.wait_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(HostError::Search(_))));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: HostConfig = toml::from_str(
            r#"
            listener = "wait_for_sources"

            [[sources]]
            id = "notes"
            entries = ["alpha", "beta"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.listener, ListenerMode::WaitForSources);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].limit, 10);
        assert_eq!(config.search.poll_interval_ms, 100);
        assert!(config.dedup);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = HostConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(HostError::Io(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = HostConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
