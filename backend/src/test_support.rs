//! In-process stub of the remote posts API, for client and runner tests.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{PostPayload, RawRow, VersionToken};
use crate::transform::mapper::map;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub raw_query: String,
    pub query: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct StubState {
    responses: Vec<(u16, Value)>,
    served: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Answers requests with a fixed script of `(status, body)` pairs, cycling
/// when the script runs out.
pub struct StubApi {
    base_url: String,
    state: Arc<StubState>,
}

impl StubApi {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let state = Arc::new(StubState {
            responses,
            ..Default::default()
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    /// Highest number of requests the stub ever handled at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let raw_query = uri.query().unwrap_or("").to_string();
    let query = raw_query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    state.requests.lock().await.push(RecordedRequest {
        path: uri.path().to_string(),
        raw_query,
        query,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    // Give overlapping requests a chance to show up
    tokio::time::sleep(Duration::from_millis(5)).await;

    let n = state.served.fetch_add(1, Ordering::SeqCst);
    let (status, body) = state
        .responses
        .get(n % state.responses.len().max(1))
        .cloned()
        .unwrap_or((200, Value::Object(Default::default())));

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

/// Map a single comma-separated line the way a batch would.
pub fn payload_for(line: &str, api_key: &str, v: &VersionToken) -> PostPayload {
    let cells = line.split(',').map(|c| c.trim().to_string()).collect();
    let row = RawRow::from_cells(cells).expect("16 cells");
    map(&row, api_key, v)
}
