//! Multisearch: a host for the `multisearch-core` search engine.
//!
//! Searches a set of configured in-memory catalogs concurrently and streams
//! every engine event as newline-delimited JSON.
//!
//! # Architecture
//!
//! - **Config**: TOML [`HostConfig`] with engine settings and catalog sources
//! - **Catalog**: [`CatalogContributor`], a case-insensitive substring source
//! - **Pipeline**: direct, throttled or wait-for-sources listener decorators
//! - **Output**: [`JsonLinesListener`] writing one JSON object per event

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod session;

pub use catalog::CatalogContributor;
pub use cli::HostArgs;
pub use config::{HostConfig, ListenerMode, SourceConfig};
pub use error::{HostError, Result};
pub use output::JsonLinesListener;
pub use session::{RunSummary, SearchRequest, run_search};
