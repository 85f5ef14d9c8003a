//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls how results are laid out, how long blocked
//! producers wait between cancellation checks, and the timing of the
//! listener decorators. The defaults match what an interactive consumer
//! needs: 100ms throttling and a 3s grace period for slow sources.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// How accepted results are arranged and how a full section admits new items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLayout {
    /// One capacity-bounded group per contributor. A full section rejects
    /// further items until space frees up.
    #[default]
    Grouped,
    /// A single globally ordered list. A full section admits a candidate
    /// that outranks its weakest item, evicting that item.
    Mixed,
}

/// Configuration for a search session and its listener pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result arrangement; see [`ResultLayout`].
    pub layout: ResultLayout,
    /// How often a producer blocked on a full section re-checks cancellation.
    pub poll_interval_ms: u64,
    /// Delay before the throttling decorator flushes buffered events.
    pub throttle_delay_ms: u64,
    /// How long the wait-for-sources decorator holds the first paint.
    pub wait_timeout_ms: u64,
    /// Restarts granted to a contributor that keeps cancelling its own fetch.
    pub max_fetch_restarts: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            layout: ResultLayout::Grouped,
            poll_interval_ms: 100,
            throttle_delay_ms: 100,
            wait_timeout_ms: 3_000,
            max_fetch_restarts: 64,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Every interval and bound must be greater than zero.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.poll_interval_ms == 0 {
            return Err(SearchError::Config(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.throttle_delay_ms == 0 {
            return Err(SearchError::Config(
                "throttle_delay_ms must be greater than 0".into(),
            ));
        }
        if self.wait_timeout_ms == 0 {
            return Err(SearchError::Config(
                "wait_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_fetch_restarts == 0 {
            return Err(SearchError::Config(
                "max_fetch_restarts must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
