//! # Bulkpost - publish social posts from a spreadsheet export
//!
//! Each row of the export becomes one post request. Requests are sent to the
//! remote publishing API one at a time, and every row yields a success or
//! failure outcome.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Parser    │────▶│   Mapper    │────▶│   Client    │
//! │  (any enc)  │     │ (16 cells)  │     │ (sparse)    │     │ (one POST)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                  BatchRunner collects outcomes → BatchSummary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulkpost::{BatchRunner, Endpoint, SubmissionClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = BatchRunner::new(SubmissionClient::new(Endpoint::default()));
//!     let summary = runner.run_file("posts.csv".as_ref(), "api-key").await.unwrap();
//!     for line in summary.lines() {
//!         println!("{}", line);
//!     }
//!     println!("{}", summary.summary_line());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`config`] - Settings and endpoint
//! - [`models`] - Rows, payloads, outcomes, summaries
//! - [`parser`] - Decoding and row splitting
//! - [`transform`] - Row mapping and the batch runner
//! - [`client`] - Remote API client
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Remote API
pub mod client;

// HTTP API
pub mod api;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{Endpoint, Settings, DEFAULT_API_BASE, TEMPLATE_URL};

pub use error::{BatchError, ConfigError, CsvError, ServerError, SubmitError};

pub use models::{
    BatchSummary, EventInfo, Offer, Outcome, PostPayload, RawRow, RunState, VersionToken,
    COLUMN_COUNT,
};

pub use parser::{decode, parse, parse_bytes};

pub use transform::{map, BatchRunner, TEMPLATE_COLUMNS};

pub use client::{Publisher, SubmissionClient};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
