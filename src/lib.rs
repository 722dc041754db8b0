//! # listen-harvest
//!
//! Streaming harvester for a music Web API: saved tracks, playlists and top
//! items, each track joined with its audio-feature vector.
//!
//! ## Design Philosophy
//!
//! listen-harvest is designed to be:
//! - **Lazy** - Records are produced on demand; nothing is requested before the first poll
//! - **Rate-limit aware** - HTTP 429 responses are waited out and resubmitted transparently
//! - **Frugal** - Audio features are fetched in batches of up to 100 ids per request
//! - **Library-first** - No CLI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use listen_harvest::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.pipeline.attach_user = true;
//!
//!     let pipeline = Pipeline::new("BQD...", &config)?;
//!
//!     let mut tracks = pipeline.library();
//!     while let Some(record) = tracks.try_next().await? {
//!         println!("{}", listen_harvest::flatten_record(&record)?.len());
//!     }
//!
//!     println!("{:?}", pipeline.stats());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authorization URL construction and redirect parsing
pub mod auth;
/// Authenticated HTTP client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batched audio-feature join
pub mod features;
/// Record flattening for tabular export
pub mod flatten;
/// Single-key list endpoints
pub mod list;
/// Track record normalization
pub mod normalize;
/// Cursor pagination
pub mod pager;
/// End-to-end pipelines
pub mod pipeline;
/// Throttle-aware request retry
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use client::{ApiClient, FetchRequest};
pub use config::{ApiConfig, Config, PipelineConfig};
pub use error::{Error, Result};
pub use features::join_features;
pub use flatten::flatten_record;
pub use list::fetch_list;
pub use normalize::normalize_tracks;
pub use pager::walk_pages;
pub use pipeline::{Pipeline, run};
pub use types::{AudioFeatures, Endpoints, FetchStats, Record, TimeRange, TopKind};
