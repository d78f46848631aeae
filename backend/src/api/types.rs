//! REST API response types.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{BatchSummary, RunState};

/// Response sent after a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Original file name, when the client sent one
    pub file_name: Option<String>,

    /// Outcomes and counters
    pub summary: BatchSummary,

    /// Display lines, one per outcome
    pub lines: Vec<String>,

    /// "Successful API Calls: X | Failed API Calls: Y"
    pub summary_line: String,
}

impl SubmitResponse {
    pub fn new(summary: BatchSummary, file_name: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            file_name,
            lines: summary.lines(),
            summary_line: summary.summary_line(),
            summary,
        }
    }
}

/// Current runner state, polled by clients to disable the submit button.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub loading: bool,
    pub state: RunState,
}

/// Multipart field names accepted by `/api/submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitField {
    ApiKey,
    File,
}

impl SubmitField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "apiKey" => Some(SubmitField::ApiKey),
            "file" => Some(SubmitField::File),
            _ => None,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
