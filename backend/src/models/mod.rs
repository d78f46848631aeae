//! Domain models for the bulk posting pipeline.
//!
//! - [`RawRow`] - One spreadsheet line with exactly [`COLUMN_COUNT`] cells
//! - [`VersionToken`] - `YYYYMMDD` token required by the remote API
//! - [`PostPayload`] - Sparse request object for one post
//! - [`Outcome`] - Per-row success or failure
//! - [`BatchSummary`] - Ordered outcomes plus counters
//! - [`RunState`] - Where a batch run currently is

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::UNKNOWN_ERROR;

/// Number of cells a spreadsheet row must have to be submitted.
pub const COLUMN_COUNT: usize = 16;

// =============================================================================
// Raw Row
// =============================================================================

/// A parsed, trimmed row of exactly [`COLUMN_COUNT`] cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawRow(Vec<String>);

impl RawRow {
    /// Wrap cells as a row, or `None` when the cell count is wrong.
    pub fn from_cells(cells: Vec<String>) -> Option<Self> {
        (cells.len() == COLUMN_COUNT).then_some(Self(cells))
    }

    /// Cell at `index`. Out of range reads as empty.
    pub fn cell(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

// =============================================================================
// Version Token
// =============================================================================

/// Date-based API version, formatted `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    /// Token for the current UTC date.
    pub fn today() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Post Payload
// =============================================================================

/// Request object for one post.
///
/// Every optional field is omitted from JSON when `None`. The credential and
/// version token ride along for the client, which puts them in the URL; they
/// are never part of the serialized body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub v: VersionToken,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clickthrough_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_info: Option<EventInfo>,
}

/// Coupon details attached to an offer post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeem_online_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_conditions: Option<String>,
}

/// Event details attached to an event post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of submitting one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// The remote service accepted the post; `response` is its JSON body.
    Success { response: Value },
    /// The post was rejected or never delivered; `error` is the detail body.
    Failure { error: Value },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Human-readable failure message, `None` for successes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(message_of(error)),
        }
    }

    /// `"Success - API call successful"` or `"Error - <message>"`.
    pub fn label(&self) -> String {
        match self.error_message() {
            None => "Success - API call successful".to_string(),
            Some(message) => format!("Error - {}", message),
        }
    }

    /// Numbered display line, `index` being 0-based.
    pub fn render(&self, index: usize) -> String {
        format!("{}. {}", index + 1, self.label())
    }
}

/// Read the `message` member of an error body, falling back to the generic label.
fn message_of(detail: &Value) -> String {
    match detail.get("message") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::String(_)) => {
            UNKNOWN_ERROR.to_string()
        }
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => UNKNOWN_ERROR.to_string(),
        Some(other) => other.to_string(),
    }
}

// =============================================================================
// Batch Summary
// =============================================================================

/// Everything a caller needs to display after a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Token sent with every row of the run. `None` before any run.
    pub version: Option<VersionToken>,
    /// Outcomes in processing order.
    pub results: Vec<Outcome>,
    pub success_count: usize,
    pub error_count: usize,
}

impl BatchSummary {
    pub fn from_results(version: VersionToken, results: Vec<Outcome>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let error_count = results.iter().filter(|r| !r.is_success()).count();
        Self {
            version: Some(version),
            results,
            success_count,
            error_count,
        }
    }

    /// One numbered line per outcome.
    pub fn lines(&self) -> Vec<String> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, outcome)| outcome.render(i))
            .collect()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Successful API Calls: {} | Failed API Calls: {}",
            self.success_count, self.error_count
        )
    }
}

// =============================================================================
// Run State
// =============================================================================

/// Observable progress of a batch run. `row` is 0-based in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Loading,
    Mapping { row: usize },
    Submitting { row: usize },
    Completed,
}

impl RunState {
    /// True from batch start until the last outcome is recorded.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            RunState::Loading | RunState::Mapping { .. } | RunState::Submitting { .. }
        )
    }
}
