//! # multisearch-core
//!
//! Concurrent fan-out search aggregation.
//!
//! One text pattern is sent to many independent result sources
//! ("contributors") at once. Their output is merged into a single bounded,
//! deduplicated, priority-ordered result set that a consumer can render
//! incrementally while the search is still running.
//!
//! ## Design
//!
//! - Every contributor runs on its own blocking worker and pushes items
//!   through an [`ItemSink`]
//! - Each contributor owns a capacity-bounded section; a producer whose
//!   section is full blocks until space frees up or the session settles
//! - Cross-contributor deduplication is a priority chain of
//!   [`EqualityProvider`]s that can skip a candidate or replace weaker items
//! - Listener calls are queued under the session lock and delivered off it,
//!   and never after the session was cancelled; the batching decorators
//!   drop their buffers on [`SearchListener::search_cancelled`]
//! - [`ThrottlingListener`] and [`WaitForSourcesListener`] batch event
//!   bursts for a slow consumer
//!
//! ## Logging
//!
//! Sessions log under a `search_session` span carrying the pattern length,
//! never the pattern itself.
//!
//! ## Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use multisearch_core::{Contributor, EventCollector, ItemSink, FetchError, SearchConfig, Searcher, SearchListener};
//! # use tokio_util::sync::CancellationToken;
//! struct Words(Vec<&'static str>);
//!
//! impl Contributor<&'static str> for Words {
//!     fn id(&self) -> &str {
//!         "words"
//!     }
//!
//!     fn fetch(
//!         &self,
//!         pattern: &str,
//!         cancel: &CancellationToken,
//!         sink: &mut ItemSink<'_, &'static str>,
//!     ) -> Result<(), FetchError> {
//!         for word in self.0.iter().filter(|w| w.contains(pattern)) {
//!             if cancel.is_cancelled() || !sink.push(*word) {
//!                 break;
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> multisearch_core::Result<()> {
//! let collector = Arc::new(EventCollector::new());
//! let searcher = Searcher::new(
//!     SearchConfig::default(),
//!     Arc::clone(&collector) as Arc<dyn SearchListener<&'static str>>,
//! )?;
//! let words: Arc<dyn Contributor<&'static str>> = Arc::new(Words(vec!["alpha", "alphabet"]));
//! let handle = searcher.search(vec![(words, 10)], "alpha")?;
//! handle.wait().await;
//! for item in handle.results() {
//!     println!("{} ({})", item.element, item.priority);
//! }
//! # Ok(())
//! # }
//! ```

mod accumulator;
pub mod config;
pub mod contributor;
pub mod equality;
pub mod error;
mod handle;
pub mod listener;
mod notify;
mod searcher;
pub mod types;
mod worker;

pub use accumulator::AddOutcome;
pub use config::{ResultLayout, SearchConfig};
pub use contributor::{Contributor, Fetched, ItemSink};
pub use equality::{compose, CompositeEqualityProvider, EqualityAction, EqualityProvider, KeyEqualityProvider};
pub use error::{FetchError, Result, SearchError};
pub use handle::SearchHandle;
pub use listener::{
    EventCollector, HasMoreMap, SearchEvent, SearchListener, ThrottlingListener,
    WaitForSourcesListener,
};
pub use searcher::{ContributorLimit, Searcher};
pub use types::{compare_found, outranks, ContributorId, ContributorInfo, Correction, FoundItem, ItemId};
