// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Transport layer: the wire contract with the file-sharing backend.
//!
//! [`Backend`] is the seam the trackers are written against; [`HttpTransport`]
//! is the production implementation talking to the client daemon's local REST
//! gateway. Every call suspends the caller until the response (or a network
//! failure) arrives, which is what makes the dispatcher's command-then-refresh
//! ordering structural rather than something to enforce with locks.
//!
//! Every response body rides in a `{success, error?}` envelope. A `success:
//! false` envelope decodes to [`ClientError::Business`] with the server's
//! message verbatim; it is never retried and never fatal.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};
use crate::types::{DownloadRecord, DownloadStatus, SearchResultEntry, ShareRecord};

/// Default gateway endpoint.
const DEFAULT_SERVER_URL: &str = "http://localhost:5050";

/// Default timeout for connection establishment (in seconds).
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default timeout for a full request round-trip (in seconds).
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request/response operations exposed by the backend collaborator.
///
/// Mirrors the gateway's logical contract one method per route. Trackers and
/// tests plug in through this trait; nothing above the transport knows about
/// HTTP.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Search the shared catalog by filename substring. No matches is an
    /// empty vector, not an error.
    async fn search(&self, query: &str) -> ClientResult<Vec<SearchResultEntry>>;

    /// Ask the server to start downloading the file behind `unique_id` to
    /// `local_path`. The server assigns the download id; the caller learns it
    /// from the next snapshot.
    async fn start_download(&self, unique_id: &str, local_path: &str) -> ClientResult<()>;

    /// Fetch the full current snapshot of all downloads known to the server.
    async fn list_downloads(&self) -> ClientResult<Vec<DownloadRecord>>;

    /// Stop and remove the download with the given server-assigned id.
    async fn remove_download(&self, id: &str) -> ClientResult<()>;

    /// Publish a local file as a share.
    async fn share_file(&self, local_path: &str) -> ClientResult<()>;

    /// Fetch the full current snapshot of published shares.
    async fn list_shares(&self) -> ClientResult<Vec<ShareRecord>>;

    /// Retract the share with the given unique id.
    async fn remove_share(&self, unique_id: &str) -> ClientResult<()>;
}

// Wire-level response structures. The gateway wraps every route in the same
// envelope; `error` may be a plain string or an array of strings (exception
// args), so it is decoded leniently.

#[derive(Debug, Deserialize)]
struct StatusResponse {
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    files: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    unique_id: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct DownloadsResponse {
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    downloads: Vec<DownloadEntry>,
}

#[derive(Debug, Deserialize)]
struct DownloadEntry {
    id: String,
    name: String,
    local_path: String,
    #[serde(default)]
    progress: Option<String>,
    done: bool,
    failed: bool,
}

#[derive(Debug, Deserialize)]
struct SharesResponse {
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    shares: Vec<ShareEntry>,
}

#[derive(Debug, Deserialize)]
struct ShareEntry {
    local_path: String,
    unique_id: String,
}

/// Render the envelope's error payload as a user-facing message.
fn error_message(error: &Option<serde_json::Value>) -> String {
    match error {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .map(|p| match p {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => "unspecified server error".to_string(),
    }
}

impl DownloadEntry {
    /// Decode the wire flags into a domain record. A record flagged both done
    /// and failed violates the contract; it is logged and kept as `Failed`
    /// rather than dropped, so the user still sees it.
    fn into_record(self) -> DownloadRecord {
        let status = match DownloadStatus::from_flags(self.done, self.failed) {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(id = %self.id, %err, "defensively marking download failed");
                DownloadStatus::Failed
            }
        };
        DownloadRecord {
            id: self.id,
            name: self.name,
            local_path: self.local_path,
            status,
            progress: self.progress,
        }
    }
}

/// HTTP implementation of [`Backend`] over the daemon's REST gateway.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base URL of the gateway.
    base_url: String,
    /// HTTP client with configured connect timeout.
    client: reqwest::Client,
    /// Timeout applied per request.
    request_timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl HttpTransport {
    /// Create a transport talking to the gateway at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set a custom per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(ClientError::from)?;

        if !response.status().is_success() {
            return Err(ClientError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                path
            )));
        }

        response.json::<T>().await.map_err(ClientError::from)
    }

    async fn get_status(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<()> {
        let status: StatusResponse = self.get_json(path, query).await?;
        if !status.success {
            return Err(ClientError::Business(error_message(&status.error)));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for HttpTransport {
    async fn search(&self, query: &str) -> ClientResult<Vec<SearchResultEntry>> {
        let path = format!("/search/{}", urlencoding::encode(query));
        let response: SearchResponse = self.get_json(&path, &[]).await?;
        if !response.success {
            return Err(ClientError::Business(error_message(&response.error)));
        }
        Ok(response
            .files
            .into_iter()
            .map(|f| SearchResultEntry {
                unique_id: f.unique_id,
                description: f.description,
            })
            .collect())
    }

    async fn start_download(&self, unique_id: &str, local_path: &str) -> ClientResult<()> {
        self.get_status(
            "/download",
            &[("unique_id", unique_id), ("local_path", local_path)],
        )
        .await
    }

    async fn list_downloads(&self) -> ClientResult<Vec<DownloadRecord>> {
        let response: DownloadsResponse = self.get_json("/list-downloads", &[]).await?;
        if !response.success {
            return Err(ClientError::Business(error_message(&response.error)));
        }
        Ok(response
            .downloads
            .into_iter()
            .map(DownloadEntry::into_record)
            .collect())
    }

    async fn remove_download(&self, id: &str) -> ClientResult<()> {
        let path = format!("/remove-download/{}", urlencoding::encode(id));
        self.get_status(&path, &[]).await
    }

    async fn share_file(&self, local_path: &str) -> ClientResult<()> {
        self.get_status("/share", &[("local_path", local_path)]).await
    }

    async fn list_shares(&self) -> ClientResult<Vec<ShareRecord>> {
        let response: SharesResponse = self.get_json("/list-shares", &[]).await?;
        if !response.success {
            return Err(ClientError::Business(error_message(&response.error)));
        }
        Ok(response
            .shares
            .into_iter()
            .map(|s| ShareRecord {
                unique_id: s.unique_id,
                local_path: s.local_path,
            })
            .collect())
    }

    async fn remove_share(&self, unique_id: &str) -> ClientResult<()> {
        let path = format!("/remove-share/{}", urlencoding::encode(unique_id));
        self.get_status(&path, &[]).await
    }
}
