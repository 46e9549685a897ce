use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{FileSource, RetrievedFile};
use crate::errors::DriveError;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:8080";

pub const RELAY_NOT_RUNNING: &str =
    "File relay is not running. Start it in another terminal with: boardcard relay";

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename="?(.+?)"?$"#).expect("filename pattern is a valid static regex")
});

#[derive(Deserialize)]
struct RelayErrorBody {
    error: Option<String>,
}

/// Retrieves attachments through the file relay's download endpoint.
#[derive(Debug, Clone)]
pub struct RelayFileSource {
    http: reqwest::Client,
    base_url: String,
}

impl RelayFileSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/download-file", self.base_url)
    }
}

impl Default for RelayFileSource {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_URL)
    }
}

/// Filename from a `Content-Disposition` value, if it names one.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    FILENAME_RE
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl FileSource for RelayFileSource {
    #[instrument(skip(self), fields(relay = %self.base_url))]
    async fn retrieve(&self, asset_id: &str) -> Result<RetrievedFile, DriveError> {
        let resp = self
            .http
            .post(self.endpoint())
            .json(&serde_json::json!({ "assetId": asset_id }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "relay request failed");
                if e.is_connect() {
                    DriveError::Retrieval(RELAY_NOT_RUNNING.to_string())
                } else {
                    DriveError::Retrieval(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default();
            let message = resp
                .json::<RelayErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| {
                    format!("Failed to download file: {} {}", status.as_u16(), reason)
                        .trim_end()
                        .to_string()
                });
            return Err(DriveError::Retrieval(message));
        }

        let file_name = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("asset-{}", asset_id));
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DriveError::Retrieval(e.to_string()))?
            .to_vec();
        debug!(size = bytes.len(), %file_name, "retrieved file from relay");

        Ok(RetrievedFile {
            bytes,
            file_name,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn filename_parses_quoted_and_bare() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"brief.pdf\""),
            Some("brief.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=notes.txt"),
            Some("notes.txt".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[tokio::test]
    async fn retrieve_reads_bytes_and_filename() {
        let base = spawn(Router::new().route(
            "/api/download-file",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["assetId"], "77");
                (
                    [
                        (header::CONTENT_TYPE, "text/plain"),
                        (header::CONTENT_DISPOSITION, "attachment; filename=\"hello.txt\""),
                    ],
                    "hello",
                )
            }),
        ))
        .await;

        let file = RelayFileSource::new(base).retrieve("77").await.unwrap();
        assert_eq!(file.bytes, b"hello");
        assert_eq!(file.file_name, "hello.txt");
        assert_eq!(file.content_type, "text/plain");
    }

    #[tokio::test]
    async fn retrieve_surfaces_relay_error_body() {
        let base = spawn(Router::new().route(
            "/api/download-file",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "Asset not found"})),
                )
            }),
        ))
        .await;

        let err = RelayFileSource::new(base).retrieve("1").await.unwrap_err();
        assert_eq!(err.to_string(), "Asset not found");
    }

    #[tokio::test]
    async fn retrieve_without_error_body_reports_status() {
        let base = spawn(Router::new().route(
            "/api/download-file",
            post(|| async { StatusCode::BAD_GATEWAY }),
        ))
        .await;

        let err = RelayFileSource::new(base).retrieve("1").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download file: 502 Bad Gateway");
    }

    #[tokio::test]
    async fn retrieve_defaults_filename_to_asset_id() {
        let base = spawn(Router::new().route(
            "/api/download-file",
            post(|| async { "raw" }),
        ))
        .await;

        let file = RelayFileSource::new(base).retrieve("55").await.unwrap();
        assert_eq!(file.file_name, "asset-55");
    }

    #[tokio::test]
    async fn retrieve_hints_when_relay_is_down() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = RelayFileSource::new(format!("http://{}", addr))
            .retrieve("1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), RELAY_NOT_RUNNING);
    }
}
