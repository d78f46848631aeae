//! Error types for the bulk posting pipeline.
//!
//! - [`CsvError`] - decoding the uploaded file
//! - [`SubmitError`] - one row's submission (never fatal, becomes an outcome)
//! - [`BatchError`] - run-level failures that abort a batch
//! - [`ConfigError`] - invalid environment configuration
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Label shown when a failure body carries no `message`.
pub const UNKNOWN_ERROR: &str = "Unknown error";

// =============================================================================
// CSV Decoding Errors
// =============================================================================

/// Errors while turning uploaded bytes into text.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Bytes could not be decoded with the detected encoding.
    #[error("Failed to decode file as {encoding}: {message}")]
    Encoding { encoding: String, message: String },
}

// =============================================================================
// Submission Errors (per row)
// =============================================================================

/// Why a single submission failed.
///
/// These never escape the row boundary: the runner turns them into
/// [`crate::models::Outcome::Failure`].
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The remote service answered with a non-success status.
    #[error("Remote rejected post (status {status})")]
    RemoteRejected { status: u16, body: Value },

    /// The request never produced a response.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A response arrived but its body was not JSON.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// The payload could not be serialized.
    #[error("Failed to encode payload: {0}")]
    Encode(String),
}

impl SubmitError {
    /// Structured detail carried by the failure outcome.
    ///
    /// Remote rejections surface the body exactly as returned; every other
    /// kind is wrapped as `{"message": ...}` so renderers have one shape to read.
    pub fn into_detail(self) -> Value {
        match self {
            SubmitError::RemoteRejected { body, .. } => body,
            SubmitError::Transport(message)
            | SubmitError::InvalidBody(message)
            | SubmitError::Encode(message) => json!({ "message": message }),
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        SubmitError::Transport(err.to_string())
    }
}

// =============================================================================
// Batch Errors (run-level)
// =============================================================================

/// Failures that abort a whole run. Nothing here is produced per row.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No credential was supplied; nothing was read or sent.
    #[error("API key is required")]
    MissingCredential,

    /// The input file could not be read; no outcomes were produced.
    #[error("Error reading file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another run is still loading.
    #[error("A batch is already running")]
    AlreadyRunning,

    /// The file bytes could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Run-level pipeline error.
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Socket or runtime failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for a single submission.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Result type for batch runs.
pub type BatchResult<T> = Result<T, BatchError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::Encoding {
            encoding: "utf-16".into(),
            message: "odd byte count".into(),
        };
        let batch_err: BatchError = csv_err.into();
        assert!(batch_err.to_string().contains("utf-16"));

        let server_err: ServerError = BatchError::MissingCredential.into();
        assert!(server_err.to_string().contains("API key is required"));
    }

    #[test]
    fn test_remote_rejection_keeps_body() {
        let err = SubmitError::RemoteRejected {
            status: 400,
            body: json!({ "message": "bad request", "code": 7 }),
        };
        let detail = err.into_detail();
        assert_eq!(detail["message"], "bad request");
        assert_eq!(detail["code"], 7);
    }

    #[test]
    fn test_transport_failure_wrapped_as_message() {
        let detail = SubmitError::Transport("connection refused".into()).into_detail();
        assert_eq!(detail, json!({ "message": "connection refused" }));
    }

    #[test]
    fn test_file_read_error_format() {
        let err = BatchError::FileRead {
            path: PathBuf::from("posts.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("posts.csv"));
        assert!(msg.contains("missing"));
    }
}
