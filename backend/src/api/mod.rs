//! HTTP API module.
//!
//! This module provides the HTTP server, its response types and the
//! log broadcaster used by the pipeline.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
