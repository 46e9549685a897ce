use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};

use crate::board::api::PlatformApi;
use crate::board::models::Asset;
use crate::board::query::ASSET_QUERY;

// ── Shared application state ──────────────────────────────────────────

pub struct RelayState {
    pub platform: Arc<dyn PlatformApi>,
    pub http: reqwest::Client,
    pub api_key: Option<String>,
}

pub type SharedState = Arc<RelayState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(rename = "assetId", default)]
    pub asset_id: Option<Value>,
}

impl DownloadRequest {
    /// Parse leniently: an unreadable body is the same as a missing id.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The asset id as text, if present and non-empty.
    pub fn asset_id(&self) -> Option<String> {
        match self.asset_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum RelayError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RelayError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            RelayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            RelayError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/download-file", post(download_file))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Resolve an asset to its URL and stream the file back to the caller.
#[instrument(skip_all)]
async fn download_file(State(state): State<SharedState>, body: Bytes) -> Response {
    match relay_asset(&state, &body).await {
        Ok(resp) => resp,
        Err(e) => {
            match &e {
                RelayError::Internal(msg) => error!(error = %msg, "relay failed"),
                RelayError::BadRequest(msg) | RelayError::NotFound(msg) => {
                    debug!(error = %msg, "relay rejected request")
                }
            }
            e.into_response()
        }
    }
}

async fn relay_asset(state: &RelayState, body: &[u8]) -> Result<Response, RelayError> {
    let asset_id = DownloadRequest::from_body(body)
        .asset_id()
        .ok_or_else(|| RelayError::BadRequest("Asset ID is required".into()))?;

    let api_key = state
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| RelayError::Internal("Monday.com API key is not configured".into()))?;

    let asset = resolve_asset(state.platform.as_ref(), &asset_id).await?;
    let file_url = asset
        .download_url()
        .ok_or_else(|| RelayError::NotFound("Asset URL not available".into()))?;

    debug!(%asset_id, "fetching asset from origin");
    let upstream = state
        .http
        .get(file_url)
        .header(header::AUTHORIZATION, api_key)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| RelayError::Internal(e.to_string()))?;

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let content_length = upstream.headers().get(header::CONTENT_LENGTH).cloned();
    let disposition = content_disposition(asset.name.as_deref());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| RelayError::Internal(e.to_string()))
}

/// Look the asset up on the platform. Missing assets are 404s, API error
/// payloads 400s, transport failures and platform error statuses 500s.
pub async fn resolve_asset(platform: &dyn PlatformApi, asset_id: &str) -> Result<Asset, RelayError> {
    let resp = platform
        .execute(ASSET_QUERY, Some(json!({ "ids": [asset_id] })))
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;

    if let Some(status) = resp.status_code {
        warn!(status, detail = %resp.error_detail(), "asset lookup failed upstream");
        return Err(RelayError::Internal(format!(
            "Monday.com API request failed with status {}",
            status
        )));
    }

    if resp.has_error() {
        warn!(detail = %resp.error_detail(), "asset lookup returned an error");
        let detail = resp
            .errors
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| resp.error_detail());
        return Err(RelayError::BadRequest(format!(
            "Monday.com API error: {}",
            detail
        )));
    }

    let first = resp
        .data_field("assets")
        .and_then(Value::as_array)
        .and_then(|assets| assets.first())
        .cloned()
        .ok_or_else(|| RelayError::NotFound("Asset not found".into()))?;

    serde_json::from_value(first)
        .map_err(|e| RelayError::Internal(format!("Failed to decode asset: {}", e)))
}

/// `attachment; filename="<name>"`, with characters that would break the
/// quoted string removed.
pub fn content_disposition(name: Option<&str>) -> HeaderValue {
    let cleaned: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    let filename = if cleaned.trim().is_empty() {
        "file"
    } else {
        cleaned.as_str()
    };
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"file\""))
}
