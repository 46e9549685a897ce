//! monday.com GraphQL client.
//!
//! [`PlatformApi`] is the seam the item store and the relay talk through;
//! [`MondayClient`] is the HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::PlatformError;

pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";
pub const DEFAULT_API_VERSION: &str = "2023-10";

/// Error code the platform uses for query-complexity budget warnings.
/// Responses carrying it still contain usable data.
pub const COMPLEXITY_ERROR_CODE: &str = "ComplexityException";

/// Raw platform response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ApiResponse {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Forbidden is keyed on the HTTP status alone; error codes never make
    /// a response forbidden.
    pub fn is_forbidden(&self) -> bool {
        self.status_code == Some(403)
    }

    /// The response's error code: the top-level `error_code`, else the
    /// first GraphQL error's `extensions.code`, else a generic marker when
    /// an `errors` array is present without codes.
    pub fn error_code(&self) -> Option<&str> {
        if let Some(code) = self.error_code.as_deref() {
            return Some(code);
        }
        let errors = self.errors.as_ref()?.as_array()?;
        let first = errors.first()?;
        Some(
            first
                .pointer("/extensions/code")
                .and_then(Value::as_str)
                .unwrap_or("GraphQLError"),
        )
    }

    pub fn has_error(&self) -> bool {
        self.error_code().is_some()
    }

    /// Human-readable error detail for logs.
    pub fn error_detail(&self) -> String {
        if let Some(errors) = &self.errors {
            return errors.to_string();
        }
        match (&self.error_code, &self.error_message) {
            (Some(code), Some(msg)) => format!("{}: {}", code, msg),
            (Some(code), None) => code.clone(),
            (None, Some(msg)) => msg.clone(),
            (None, None) => match self.status_code {
                Some(status) => format!("HTTP {}", status),
                None => "unknown error".to_string(),
            },
        }
    }

    /// `data.<field>` if present and not null.
    pub fn data_field(&self, field: &str) -> Option<&Value> {
        self.data
            .as_ref()?
            .get(field)
            .filter(|value| !value.is_null())
    }
}

/// Executes GraphQL documents against the platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<ApiResponse, PlatformError>;
}

/// HTTP client for the monday.com API.
#[derive(Debug, Clone)]
pub struct MondayClient {
    http: reqwest::Client,
    api_url: String,
    api_version: String,
    api_key: String,
}

impl MondayClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

#[async_trait]
impl PlatformApi for MondayClient {
    #[instrument(skip(self, query, variables), fields(api_url = %self.api_url))]
    async fn execute(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<ApiResponse, PlatformError> {
        if self.api_key.is_empty() {
            return Err(PlatformError::MissingApiKey);
        }

        let resp = self
            .http
            .post(&self.api_url)
            .header("Authorization", &self.api_key)
            .header("API-Version", &self.api_version)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(PlatformError::Transport)?;

        let status = resp.status();
        debug!(status = status.as_u16(), "platform API responded");
        let body = resp.text().await.map_err(PlatformError::Transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()));
        }

        // Error statuses usually carry an envelope too; keep it so callers
        // can classify the failure, and pin the HTTP status on it.
        warn!(status = status.as_u16(), "platform API returned error status");
        let mut envelope: ApiResponse = serde_json::from_str(&body).unwrap_or_default();
        envelope.status_code = Some(status.as_u16());
        if !envelope.has_error() {
            envelope.error_code = Some(format!("HTTP_{}", status.as_u16()));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_code_prefers_top_level_code() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "error_code": "ColumnValueException",
            "errors": [{"message": "x", "extensions": {"code": "Other"}}]
        }))
        .unwrap();
        assert_eq!(resp.error_code(), Some("ColumnValueException"));
    }

    #[test]
    fn error_code_reads_graphql_extensions() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "errors": [{"message": "bad", "extensions": {"code": "InvalidArgument"}}]
        }))
        .unwrap();
        assert_eq!(resp.error_code(), Some("InvalidArgument"));

        let bare: ApiResponse =
            serde_json::from_value(json!({"errors": [{"message": "bad"}]})).unwrap();
        assert_eq!(bare.error_code(), Some("GraphQLError"));
    }

    #[test]
    fn clean_response_has_no_error() {
        let resp = ApiResponse::with_data(json!({"items": []}));
        assert!(!resp.has_error());
        assert!(!resp.is_forbidden());
        assert_eq!(resp.data_field("items"), Some(&json!([])));
        assert_eq!(resp.data_field("missing"), None);
    }

    #[test]
    fn forbidden_is_keyed_on_status() {
        let by_status = ApiResponse {
            status_code: Some(403),
            ..Default::default()
        };
        assert!(by_status.is_forbidden());

        let by_code = ApiResponse {
            error_code: Some("UserUnauthorizedException".into()),
            ..Default::default()
        };
        assert!(!by_code.is_forbidden());
        assert!(by_code.has_error());
    }

    #[test]
    fn error_detail_falls_back_to_status() {
        let resp = ApiResponse {
            status_code: Some(500),
            ..Default::default()
        };
        assert_eq!(resp.error_detail(), "HTTP 500");
    }

    #[tokio::test]
    async fn empty_api_key_is_rejected_before_sending() {
        let client = MondayClient::new("").with_api_url("http://127.0.0.1:9/v2");
        let err = client.execute("query { me { id } }", None).await.unwrap_err();
        assert!(matches!(err, PlatformError::MissingApiKey));
    }
}
