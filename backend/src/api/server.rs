//! HTTP server for bulk posting.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|------------------------------------------|
//! | GET    | `/health`      | Health check                             |
//! | POST   | `/api/submit`  | Upload a spreadsheet export and publish  |
//! | GET    | `/api/status`  | Loading flag and current run state       |
//! | GET    | `/api/results` | Summary of the last run                  |
//! | GET    | `/api/logs`    | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, StatusResponse, SubmitField, SubmitResponse};
use crate::client::SubmissionClient;
use crate::config::{Settings, MAX_UPLOAD_SIZE};
use crate::error::{BatchError, ServerResult};
use crate::models::BatchSummary;
use crate::transform::pipeline::BatchRunner;

type ApiError = (StatusCode, Json<Value>);

/// Shared server state: one runner, and the summary of its last run.
pub struct AppState {
    pub runner: BatchRunner<SubmissionClient>,
    last: RwLock<BatchSummary>,
}

impl AppState {
    pub fn new(runner: BatchRunner<SubmissionClient>) -> Self {
        Self {
            runner,
            last: RwLock::new(BatchSummary::default()),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/submit", post(submit))
        .route("/api/status", get(status))
        .route("/api/results", get(results))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> ServerResult<()> {
    let runner = BatchRunner::new(SubmissionClient::new(settings.endpoint.clone()));
    let app = router(Arc::new(AppState::new(runner)));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(port = settings.port, api_base = %settings.endpoint.api_base, "Bulkpost server running");
    info!("POST /api/submit  - Upload spreadsheet export (fields: apiKey, file)");
    info!("GET  /api/status  - Loading flag");
    info!("GET  /api/results - Last run summary");
    info!("GET  /api/logs    - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bulkpost",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "submit": "POST /api/submit",
            "status": "GET /api/status",
            "results": "GET /api/results",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        loading: state.runner.is_loading(),
        state: state.runner.state(),
    })
}

async fn results(State(state): State<Arc<AppState>>) -> Json<BatchSummary> {
    Json(state.last.read().await.clone())
}

/// Run a batch over an uploaded file
async fn submit(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut api_key = String::new();
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let kind = field.name().and_then(SubmitField::from_name);
        match kind {
            Some(SubmitField::ApiKey) => {
                api_key = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
            }
            Some(SubmitField::File) => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            None => {}
        }
    }

    // Credential first: a missing key is reported even without a file
    if api_key.is_empty() {
        return Err(batch_error(BatchError::MissingCredential));
    }
    let bytes = file_data.ok_or_else(|| bad_request("No file provided".to_string()))?;

    log_info(format!(
        "New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let summary = state
        .runner
        .run(&bytes, &api_key)
        .await
        .map_err(batch_error)?;

    // A new run replaces the previous one entirely
    *state.last.write().await = summary.clone();

    Ok(Json(SubmitResponse::new(summary, file_name)))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(&message)))
}

fn batch_error(err: BatchError) -> ApiError {
    let status = match &err {
        BatchError::MissingCredential => StatusCode::BAD_REQUEST,
        BatchError::AlreadyRunning => StatusCode::CONFLICT,
        BatchError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BatchError::FileRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use crate::test_support::StubApi;
    use chrono::NaiveDate;

    const BOUNDARY: &str = "bulkpost-test-boundary";

    /// Hand-built multipart body with optional apiKey and file parts.
    fn multipart_body(api_key: Option<&str>, file: Option<&str>) -> Vec<u8> {
        let mut body = String::new();
        if let Some(key) = api_key {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"apiKey\"\r\n\r\n{key}\r\n"
            ));
        }
        if let Some(content) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"posts.csv\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body.into_bytes()
    }

    async fn serve(remote: &StubApi) -> String {
        let runner = BatchRunner::new(SubmissionClient::new(Endpoint::new(remote.base_url())))
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let app = router(Arc::new(AppState::new(runner)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post_submit(base: &str, body: Vec<u8>) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/submit", base))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_results_default_to_zero() {
        let remote = StubApi::start(vec![(200, json!({}))]).await;
        let base = serve(&remote).await;

        let body: Value = reqwest::get(format!("{}/api/results", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["successCount"], 0);
        assert_eq!(body["errorCount"], 0);
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn test_submit_without_key_is_rejected() {
        let remote = StubApi::start(vec![(200, json!({}))]).await;
        let base = serve(&remote).await;

        let response = post_submit(&base, multipart_body(None, Some("h\n"))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(remote.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_runs_batch_and_stores_results() {
        let remote = StubApi::start(vec![
            (200, json!({ "id": "p1" })),
            (400, json!({ "message": "bad request" })),
        ])
        .await;
        let base = serve(&remote).await;
        let csv = "header\ne1,,,one,,,,,,,,,,,,\ne2,,,two,,,,,,,,,,,,";

        let response = post_submit(&base, multipart_body(Some("k"), Some(csv))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["fileName"], "posts.csv");
        assert_eq!(body["summary"]["successCount"], 1);
        assert_eq!(body["summary"]["errorCount"], 1);
        assert_eq!(body["lines"][1], "2. Error - bad request");

        let last: Value = reqwest::get(format!("{}/api/results", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(last["successCount"], 1);
        assert_eq!(last["version"], "20240101");

        let status: Value = reqwest::get(format!("{}/api/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["loading"], false);
        assert_eq!(status["state"]["state"], "completed");
    }

    #[tokio::test]
    async fn test_submit_sends_key_as_entered() {
        let remote = StubApi::start(vec![(200, json!({}))]).await;
        let base = serve(&remote).await;
        let csv = "header\ne1,,,one,,,,,,,,,,,,";

        let response = post_submit(&base, multipart_body(Some(" k1 "), Some(csv))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let requests = remote.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].raw_query, "api_key=%20k1%20&v=20240101");
    }

    #[tokio::test]
    async fn test_submit_without_file_is_rejected() {
        let remote = StubApi::start(vec![(200, json!({}))]).await;
        let base = serve(&remote).await;

        let response = post_submit(&base, multipart_body(Some("k"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
