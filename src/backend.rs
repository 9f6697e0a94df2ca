//! HTTP client for the external indexing backend. The backend owns the real
//! RAG pipeline (chunking, embedding, vector search); this side only speaks
//! its three-endpoint contract.

use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub vector_store_active: bool,
    #[serde(default)]
    pub chunks_indexed: u64,
}

#[derive(Debug, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub chunks_added: u64,
    #[serde(default)]
    pub total_chunks: u64,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Failure bodies are `{"detail": "..."}`; anything undecodable falls back
/// to the caller's generic message.
async fn rejection(resp: reqwest::Response, fallback: &str) -> BackendError {
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| fallback.to_string());
    BackendError::Rejected(detail)
}

pub async fn check_health(base_url: &str) -> Result<HealthReport, BackendError> {
    let client = Client::new();
    let resp = client
        .get(format!("{}/health", base_url))
        .timeout(HEALTH_TIMEOUT)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(rejection(resp, "Backend health check failed").await);
    }
    Ok(resp.json().await?)
}

/// Upload the original, unmodified file as multipart form data.
pub async fn upload_file(
    base_url: &str,
    filename: &str,
    media_type: &str,
    bytes: Vec<u8>,
) -> Result<UploadReceipt, BackendError> {
    let client = Client::new();
    let part = multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(media_type)?;
    let form = multipart::Form::new().part("file", part);

    let resp = client
        .post(format!("{}/upload", base_url))
        .multipart(form)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(rejection(resp, "Unknown error").await);
    }
    Ok(resp.json().await?)
}

pub async fn query(
    base_url: &str,
    question: &str,
    session_id: &str,
) -> Result<QueryResponse, BackendError> {
    let client = Client::new();
    let resp = client
        .post(format!("{}/query", base_url))
        .timeout(QUERY_TIMEOUT)
        .json(&QueryRequest {
            query: question,
            session_id,
        })
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(rejection(resp, "Backend query failed").await);
    }
    Ok(resp.json().await?)
}
