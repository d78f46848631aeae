//! Batch runner: file bytes in, [`BatchSummary`] out.
//!
//! Rows are mapped and submitted strictly one after another. Each submission
//! is awaited and its outcome recorded before the next row is touched; a
//! failed row never stops the batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use bulkpost::{BatchRunner, Endpoint, SubmissionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = BatchRunner::new(SubmissionClient::new(Endpoint::default()));
//!     let summary = runner.run_file("posts.csv".as_ref(), "my-api-key").await?;
//!
//!     println!("{}", summary.summary_line());
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::api::logs::{
    log_error, log_error_indent, log_info, log_success, log_success_indent, log_warning,
};
use crate::client::Publisher;
use crate::error::{BatchError, BatchResult};
use crate::models::{BatchSummary, Outcome, RawRow, RunState, VersionToken, COLUMN_COUNT};
use crate::parser::parse_bytes;
use crate::transform::mapper::map;

/// Drives parse → map → submit for one batch at a time.
pub struct BatchRunner<P> {
    publisher: P,
    loading: AtomicBool,
    state: watch::Sender<RunState>,
    /// Fixed date for the version token; today (UTC) when `None`.
    date: Option<NaiveDate>,
}

impl<P: Publisher> BatchRunner<P> {
    pub fn new(publisher: P) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            publisher,
            loading: AtomicBool::new(false),
            state,
            date: None,
        }
    }

    /// Pin the date used for the version token.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// True while a run is in progress.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state transitions as they happen.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Run a batch over already-read file bytes.
    ///
    /// Fails only when the credential is empty, another run is loading, or
    /// the bytes cannot be decoded. Per-row failures end up in the summary.
    pub async fn run(&self, bytes: &[u8], api_key: &str) -> BatchResult<BatchSummary> {
        require_credential(api_key)?;
        let _guard = self.begin()?;

        let rows = parse_bytes(bytes)?;
        Ok(self.run_rows(rows, api_key).await)
    }

    /// Read `path`, then run a batch over its contents.
    ///
    /// The credential is checked before the file is opened.
    pub async fn run_file(&self, path: &Path, api_key: &str) -> BatchResult<BatchSummary> {
        require_credential(api_key)?;
        let _guard = self.begin()?;

        log_info(format!("Reading {}", path.display()));
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            log_error(format!("Error reading file: {}", source));
            BatchError::FileRead {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let rows = parse_bytes(&bytes)?;
        Ok(self.run_rows(rows, api_key).await)
    }

    async fn run_rows(&self, rows: Vec<RawRow>, api_key: &str) -> BatchSummary {
        let version = match self.date {
            Some(date) => VersionToken::from_date(date),
            None => VersionToken::today(),
        };
        if rows.is_empty() {
            log_warning(format!("No rows with {} cells found", COLUMN_COUNT));
        }
        log_info(format!("Submitting {} rows (v={})", rows.len(), version));

        let mut results = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            self.state.send_replace(RunState::Mapping { row: index });
            let payload = map(row, api_key, &version);

            self.state.send_replace(RunState::Submitting { row: index });
            let outcome = match self.publisher.submit(&payload).await {
                Ok(response) => Outcome::Success { response },
                Err(err) => {
                    tracing::debug!(row = index, error = %err, "Row failed");
                    Outcome::Failure {
                        error: err.into_detail(),
                    }
                }
            };

            if outcome.is_success() {
                log_success_indent(outcome.render(index), 1);
            } else {
                log_error_indent(outcome.render(index), 1);
            }
            results.push(outcome);
        }

        let summary = BatchSummary::from_results(version, results);
        self.state.send_replace(RunState::Completed);
        log_success(summary.summary_line());
        summary
    }

    /// Raise the loading flag, refusing if it is already raised.
    fn begin(&self) -> BatchResult<LoadingGuard<'_>> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BatchError::AlreadyRunning);
        }
        self.state.send_replace(RunState::Loading);
        Ok(LoadingGuard {
            loading: &self.loading,
            state: &self.state,
        })
    }
}

fn require_credential(api_key: &str) -> BatchResult<()> {
    if api_key.is_empty() {
        log_error("API key is required.");
        return Err(BatchError::MissingCredential);
    }
    Ok(())
}

/// Lowers the loading flag when a run ends, however it ends.
struct LoadingGuard<'a> {
    loading: &'a AtomicBool,
    state: &'a watch::Sender<RunState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        // A run that never completed (read or decode failure) goes back to idle
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = RunState::Idle;
                true
            } else {
                false
            }
        });
        self.loading.store(false, Ordering::SeqCst);
    }
}
