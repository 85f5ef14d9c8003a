//! In-memory catalog contributor.

use std::time::{Duration, Instant};

use multisearch_core::{Contributor, FetchError, ItemSink};
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;

const EXACT_BONUS: i32 = 300;
const PREFIX_BONUS: i32 = 200;
const SUBSTRING_BONUS: i32 = 100;
const MAX_LENGTH_PENALTY: usize = 99;

/// Case-insensitive substring search over a fixed list of entries.
pub struct CatalogContributor {
    id: String,
    entries: Vec<String>,
    sort_weight: i32,
    supports_empty_pattern: bool,
    slow: bool,
    item_delay: Duration,
    control_prefix: Option<String>,
}

impl CatalogContributor {
    pub fn from_config(source: &SourceConfig) -> Self {
        Self {
            id: source.id.clone(),
            entries: source.entries.clone(),
            sort_weight: source.sort_weight,
            supports_empty_pattern: source.supports_empty_pattern,
            slow: source.slow,
            item_delay: Duration::from_millis(source.item_delay_ms),
            control_prefix: source.control_prefix.clone(),
        }
    }

    fn needle(&self, pattern: &str) -> String {
        let pattern = match &self.control_prefix {
            Some(prefix) => pattern.strip_prefix(prefix.as_str()).unwrap_or(pattern),
            None => pattern,
        };
        pattern.trim().to_lowercase()
    }

    /// Sleep for the configured item delay, returning early on cancellation.
    fn pause(&self, cancel: &CancellationToken) {
        let deadline = Instant::now() + self.item_delay;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(10)));
        }
    }
}

impl Contributor<String> for CatalogContributor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_weight(&self) -> i32 {
        self.sort_weight
    }

    fn supports_empty_pattern(&self) -> bool {
        self.supports_empty_pattern
    }

    fn is_slow(&self) -> bool {
        self.slow
    }

    fn filter_control_symbols(&self, pattern: &str) -> String {
        self.needle(pattern)
    }

    /// Exact matches beat prefix matches beat substring matches; shorter
    /// entries win within a tier.
    fn priority(&self, element: &String, pattern: &str) -> i32 {
        let needle = self.needle(pattern);
        if needle.is_empty() {
            return 0;
        }
        let haystack = element.to_lowercase();
        let bonus = if haystack == needle {
            EXACT_BONUS
        } else if haystack.starts_with(&needle) {
            PREFIX_BONUS
        } else if haystack.contains(&needle) {
            SUBSTRING_BONUS
        } else {
            0
        };
        let penalty = haystack.chars().count().min(MAX_LENGTH_PENALTY) as i32;
        bonus - penalty
    }

    fn is_valid(&self, element: &String) -> bool {
        !element.trim().is_empty()
    }

    fn fetch(
        &self,
        pattern: &str,
        cancel: &CancellationToken,
        sink: &mut ItemSink<'_, String>,
    ) -> Result<(), FetchError> {
        let needle = self.needle(pattern);
        for entry in &self.entries {
            if !self.item_delay.is_zero() {
                self.pause(cancel);
            }
            if cancel.is_cancelled() {
                break;
            }
            if !needle.is_empty() && !entry.to_lowercase().contains(&needle) {
                continue;
            }
            if !sink.push(entry.clone()) {
                break;
            }
        }
        Ok(())
    }
}
