//! Remote publishing API client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bulkpost::{Endpoint, Publisher, SubmissionClient};
//!
//! let client = SubmissionClient::new(Endpoint::default());
//! let response = client.submit(&payload).await?;
//! ```

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use crate::config::Endpoint;
use crate::error::{SubmitError, SubmitResult};
use crate::models::PostPayload;

/// Something that can publish one post.
///
/// The batch runner only talks to this trait, so a deterministic stub can
/// stand in for the network.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload`, returning the remote JSON body on success.
    async fn submit(&self, payload: &PostPayload) -> SubmitResult<Value>;
}

/// HTTP publisher for the posts endpoint.
///
/// No timeout and no retry: each call is one POST.
#[derive(Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl SubmissionClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Publisher for SubmissionClient {
    async fn submit(&self, payload: &PostPayload) -> SubmitResult<Value> {
        let url = self
            .endpoint
            .posts_url(&payload.api_key, payload.v.as_str());
        let body =
            serde_json::to_string(payload).map_err(|e| SubmitError::Encode(e.to_string()))?;

        debug!(
            url = %self.endpoint.posts_url("***", payload.v.as_str()),
            body = %body,
            "Sending post"
        );

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Response received");

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| SubmitError::InvalidBody(e.to_string()))?;

        if !status.is_success() {
            return Err(SubmitError::RemoteRejected {
                status: status.as_u16(),
                body: parsed,
            });
        }

        Ok(parsed)
    }
}
