//! Google Drive provider.
//!
//! Sign-in uses the installed-app OAuth flow: a one-shot listener on a
//! loopback port receives the authorization code after the user consents in
//! their browser, and the code is exchanged for an access token. Uploads use
//! the Drive v3 `multipart/related` endpoint with progress reported as the
//! request body is consumed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::{Router, extract::Query, response::Html, routing::get};
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    DriveProvider, FOLDER_MIME_TYPE, FolderPick, PickedEntry, ProgressFn, RetrievedFile,
    UploadedFile,
};
use crate::errors::DriveError;

pub const SCOPES: &str =
    "https://www.googleapis.com/auth/drive.file https://www.googleapis.com/auth/drive.readonly";

/// Upload body chunk size; progress is reported once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Google endpoints, overridable for tests.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub files_url: String,
    pub upload_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            files_url: "https://www.googleapis.com/drive/v3/files".to_string(),
            upload_url: "https://www.googleapis.com/upload/drive/v3/files".to_string(),
        }
    }
}

/// The interactive parts of the flow: showing the consent page and letting
/// the user pick a folder.
pub trait DriveInteraction: Send + Sync {
    fn open_consent(&self, url: &str);

    /// Index of the chosen entry, or `None` when the user backs out.
    fn choose_folder(&self, entries: &[PickedEntry]) -> Option<usize>;
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        self.expires_at.is_none_or(|expires| now < expires)
    }
}

/// `now + secs`, or `None` (no expiry) when `secs` is out of range.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListing {
    #[serde(default)]
    files: Vec<ListedFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedFile {
    id: String,
    name: String,
    mime_type: String,
    web_view_link: Option<String>,
}

pub struct GoogleDrive {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    endpoints: GoogleEndpoints,
    interaction: Arc<dyn DriveInteraction>,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleDrive {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        interaction: Arc<dyn DriveInteraction>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.filter(|id| !id.is_empty()),
            client_secret: client_secret.filter(|s| !s.is_empty()),
            endpoints: GoogleEndpoints::default(),
            interaction,
            token: Mutex::new(None),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_token(self, token: AccessToken) -> Self {
        *self.token_slot() = Some(token);
        self
    }

    fn token_slot(&self) -> MutexGuard<'_, Option<AccessToken>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bearer(&self) -> Result<String, DriveError> {
        self.token_slot()
            .as_ref()
            .filter(|t| t.is_valid_at(Utc::now()))
            .map(|t| t.access_token.clone())
            .ok_or(DriveError::NotAuthenticated)
    }

    fn client_id(&self) -> Result<&str, DriveError> {
        self.client_id.as_deref().ok_or(DriveError::MissingClientId)
    }

    /// Consent page URL for the loopback flow.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, DriveError> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.client_id()?),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "consent"),
                ("access_type", "online"),
            ],
        )
        .map_err(|e| DriveError::Auth(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<AccessToken, DriveError> {
        let mut form = vec![
            ("client_id", self.client_id()?),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        // Error responses come back as JSON with a 400 status, so parse
        // the body regardless of status.
        let resp: TokenResponse = self
            .http
            .post(&self.endpoints.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        match (resp.access_token, resp.error) {
            (Some(access_token), _) => Ok(AccessToken {
                access_token,
                expires_at: resp.expires_in.and_then(|secs| expiry_after(Utc::now(), secs)),
            }),
            (None, Some(err)) => Err(DriveError::Auth(
                resp.error_description
                    .map(|d| format!("{}: {}", err, d))
                    .unwrap_or(err),
            )),
            (None, None) => Err(DriveError::Auth("Unexpected response from Google".into())),
        }
    }

    /// Folders visible to the user, with "My Drive" first.
    pub async fn list_folders(&self) -> Result<Vec<PickedEntry>, DriveError> {
        let token = self.bearer()?;
        let listing: FileListing = self
            .http
            .get(&self.endpoints.files_url)
            .bearer_auth(token)
            .query(&[
                (
                    "q",
                    format!("mimeType='{}' and trashed=false", FOLDER_MIME_TYPE).as_str(),
                ),
                ("fields", "files(id,name,mimeType,webViewLink)"),
                ("orderBy", "name"),
                ("pageSize", "200"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut entries = vec![PickedEntry {
            id: "root".to_string(),
            name: "My Drive".to_string(),
            url: None,
            mime_type: FOLDER_MIME_TYPE.to_string(),
        }];
        entries.extend(listing.files.into_iter().map(|f| PickedEntry {
            id: f.id,
            name: f.name,
            url: f.web_view_link,
            mime_type: f.mime_type,
        }));
        Ok(entries)
    }
}

#[async_trait]
impl DriveProvider for GoogleDrive {
    async fn initialize(&self) -> Result<(), DriveError> {
        self.client_id().map(|_| ())
    }

    fn is_authenticated(&self) -> bool {
        self.bearer().is_ok()
    }

    #[instrument(skip(self))]
    async fn authenticate(&self) -> Result<(), DriveError> {
        self.client_id()?;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| DriveError::Auth(format!("Failed to open callback listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| DriveError::Auth(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);
        let state = Uuid::new_v4().simple().to_string();

        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let callback = Router::new().route(
            "/",
            get(move |Query(params): Query<CallbackParams>| {
                let tx = tx.clone();
                async move {
                    if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                        let _ = tx.send(params);
                    }
                    Html("<p>Signed in to Google Drive. You can close this window.</p>")
                }
            }),
        );
        let server = tokio::spawn(async move { axum::serve(listener, callback).await });

        let url = self.authorization_url(&redirect_uri, &state)?;
        debug!(%redirect_uri, "waiting for OAuth callback");
        self.interaction.open_consent(&url);

        let params = rx.await;
        server.abort();
        let params = params.map_err(|_| DriveError::Auth("Sign-in was not completed".into()))?;

        if let Some(err) = params.error {
            return Err(DriveError::Auth(err));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(DriveError::Auth("OAuth state mismatch".into()));
        }
        let code = params
            .code
            .ok_or_else(|| DriveError::Auth("No authorization code returned".into()))?;

        let token = self.exchange_code(&code, &redirect_uri).await?;
        *self.token_slot() = Some(token);
        info!("authenticated with Google Drive");
        Ok(())
    }

    async fn pick_folder(&self) -> Result<FolderPick, DriveError> {
        let entries = self.list_folders().await?;
        let interaction = self.interaction.clone();
        let shown = entries.clone();
        let choice = tokio::task::spawn_blocking(move || interaction.choose_folder(&shown))
            .await
            .map_err(|e| DriveError::Auth(format!("Folder picker failed: {}", e)))?;

        Ok(match choice.and_then(|i| entries.into_iter().nth(i)) {
            Some(entry) => FolderPick::Picked(entry),
            None => FolderPick::Cancelled,
        })
    }

    #[instrument(skip(self, file, progress), fields(size = file.bytes.len()))]
    async fn upload(
        &self,
        file: RetrievedFile,
        file_name: &str,
        folder_id: &str,
        progress: ProgressFn,
    ) -> Result<UploadedFile, DriveError> {
        let token = self.bearer()?;
        let boundary = format!("boardcard-{}", Uuid::new_v4().simple());
        let parents: Vec<&str> = if folder_id.is_empty() {
            Vec::new()
        } else {
            vec![folder_id]
        };
        let metadata = json!({ "name": file_name, "parents": parents });

        let chunks = multipart_related(&boundary, &metadata, &file.content_type, file.bytes);
        let total: usize = chunks.iter().map(Vec::len).sum();
        let body = reqwest::Body::wrap_stream(progress_stream(chunks, total, progress));

        let resp = self
            .http
            .post(&self.endpoints.upload_url)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,name,webViewLink,webContentLink"),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(body)
            .send()
            .await
            .map_err(|e| DriveError::Upload(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DriveError::Upload(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, "unreadable upload response");
                DriveError::Upload("Failed to parse upload response".into())
            });
        }

        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(DriveError::Upload(message))
    }

    async fn sign_out(&self) {
        let token = self.token_slot().take();
        if let Some(token) = token {
            let result = self
                .http
                .post(&self.endpoints.revoke_url)
                .form(&[("token", token.access_token.as_str())])
                .send()
                .await;
            match result {
                Ok(_) => debug!("token revoked"),
                Err(e) => warn!(error = %e, "token revocation failed"),
            }
        }
    }
}

/// Build a `multipart/related` body: JSON metadata then the file content,
/// split into upload-sized chunks.
pub fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    bytes: Vec<u8>,
) -> Vec<Vec<u8>> {
    let head = format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {ct}\r\n\r\n",
        b = boundary,
        meta = metadata,
        ct = content_type,
    );
    let tail = format!("\r\n--{}--\r\n", boundary);

    let mut chunks = vec![head.into_bytes()];
    chunks.extend(bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec));
    chunks.push(tail.into_bytes());
    chunks
}

/// Yield `chunks` in order, reporting cumulative progress after each.
pub fn progress_stream(
    chunks: Vec<Vec<u8>>,
    total: usize,
    progress: ProgressFn,
) -> impl futures::Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
    let mut sent = 0usize;
    futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        progress(percent(sent, total));
        Ok(chunk)
    })
}

fn percent(sent: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (sent as f64 / total as f64 * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json};
    use std::collections::HashMap;

    struct ScriptedInteraction {
        choice: Option<usize>,
    }

    impl DriveInteraction for ScriptedInteraction {
        fn open_consent(&self, url: &str) {
            // Play the browser: follow the consent URL straight to the
            // loopback redirect with a code.
            let url = reqwest::Url::parse(url).unwrap();
            let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let redirect = format!(
                "{}/?code=authcode&state={}",
                params["redirect_uri"], params["state"]
            );
            tokio::spawn(async move {
                let _ = reqwest::get(redirect).await;
            });
        }

        fn choose_folder(&self, _entries: &[PickedEntry]) -> Option<usize> {
            self.choice
        }
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn endpoints(base: &str) -> GoogleEndpoints {
        GoogleEndpoints {
            auth_url: format!("{}/auth", base),
            token_url: format!("{}/token", base),
            revoke_url: format!("{}/revoke", base),
            files_url: format!("{}/files", base),
            upload_url: format!("{}/upload", base),
        }
    }

    fn drive(base: &str, choice: Option<usize>) -> GoogleDrive {
        GoogleDrive::new(
            Some("client-1".into()),
            Some("secret".into()),
            Arc::new(ScriptedInteraction { choice }),
        )
        .with_endpoints(endpoints(base))
    }

    fn valid_token() -> AccessToken {
        AccessToken {
            access_token: "tok".into(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }

    #[test]
    fn token_validity_respects_expiry() {
        let now = Utc::now();
        let expired = AccessToken {
            access_token: "t".into(),
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(!expired.is_valid_at(now));
        let open_ended = AccessToken {
            access_token: "t".into(),
            expires_at: None,
        };
        assert!(open_ended.is_valid_at(now));
    }

    #[test]
    fn out_of_range_lifetime_means_no_expiry() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 3599), Some(now + Duration::seconds(3599)));
        assert_eq!(expiry_after(now, i64::MAX), None);
        assert_eq!(expiry_after(now, i64::MIN), None);
    }

    #[test]
    fn multipart_body_wraps_metadata_and_content() {
        let chunks = multipart_related("XYZ", &json!({"name": "a.txt"}), "text/plain", b"hi".to_vec());
        let body = String::from_utf8(chunks.concat()).unwrap();
        assert!(body.starts_with("--XYZ\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"a.txt\"}"));
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhi\r\n--XYZ--\r\n"));
    }

    #[test]
    fn multipart_body_splits_large_content() {
        let chunks = multipart_related("B", &json!({}), "application/pdf", vec![0u8; CHUNK_SIZE * 2 + 1]);
        // head + 3 content chunks + tail
        assert_eq!(chunks.len(), 5);
    }

    #[tokio::test]
    async fn progress_stream_reports_up_to_hundred() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
        let chunks = vec![vec![0u8; 25], vec![0u8; 25], vec![0u8; 50]];
        let collected: Vec<_> = progress_stream(chunks, 100, progress).collect().await;
        assert_eq!(collected.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![25.0, 50.0, 100.0]);
    }

    #[tokio::test]
    async fn initialize_requires_client_id() {
        let drive = GoogleDrive::new(None, None, Arc::new(ScriptedInteraction { choice: None }));
        assert!(matches!(drive.initialize().await, Err(DriveError::MissingClientId)));
    }

    #[tokio::test]
    async fn authenticate_exchanges_loopback_code() {
        let base = spawn(Router::new().route(
            "/token",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                assert_eq!(form["code"], "authcode");
                assert_eq!(form["grant_type"], "authorization_code");
                assert_eq!(form["client_secret"], "secret");
                Json(json!({"access_token": "fresh", "expires_in": 3600}))
            }),
        ))
        .await;

        let drive = drive(&base, None);
        assert!(!drive.is_authenticated());
        drive.authenticate().await.unwrap();
        assert!(drive.is_authenticated());
    }

    #[tokio::test]
    async fn authenticate_surfaces_token_error() {
        let base = spawn(Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Bad code"})),
                )
            }),
        ))
        .await;

        let err = drive(&base, None).authenticate().await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed: invalid_grant: Bad code");
    }

    #[tokio::test]
    async fn pick_folder_returns_choice_or_cancel() {
        let base = spawn(Router::new().route(
            "/files",
            get(|| async {
                Json(json!({"files": [
                    {"id": "f1", "name": "Clients", "mimeType": FOLDER_MIME_TYPE, "webViewLink": "https://drive/f1"}
                ]}))
            }),
        ))
        .await;

        let picked = drive(&base, Some(1)).with_token(valid_token()).pick_folder().await.unwrap();
        match picked {
            FolderPick::Picked(entry) => {
                assert_eq!(entry.id, "f1");
                assert!(entry.is_folder());
            }
            other => panic!("Expected a pick, got {:?}", other),
        }

        let cancelled = drive(&base, None).with_token(valid_token()).pick_folder().await.unwrap();
        assert_eq!(cancelled, FolderPick::Cancelled);
    }

    #[tokio::test]
    async fn pick_folder_requires_token() {
        let err = drive("http://127.0.0.1:9", Some(0)).pick_folder().await.unwrap_err();
        assert!(matches!(err, DriveError::NotAuthenticated));
    }

    #[tokio::test]
    async fn upload_posts_multipart_and_reports_progress() {
        let base = spawn(Router::new().route(
            "/upload",
            post(|headers: HeaderMap, body: String| async move {
                let ct = headers["content-type"].to_str().unwrap().to_string();
                assert!(ct.starts_with("multipart/related; boundary="));
                assert_eq!(headers["authorization"], "Bearer tok");
                assert!(body.contains("\"parents\":[\"folder-9\"]"));
                assert!(body.contains("file-bytes"));
                Json(json!({
                    "id": "up1",
                    "name": "brief.pdf",
                    "webViewLink": "https://drive/up1"
                }))
            }),
        ))
        .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let file = RetrievedFile {
            bytes: b"file-bytes".to_vec(),
            file_name: "brief.pdf".into(),
            content_type: "application/pdf".into(),
        };
        let uploaded = drive(&base, None)
            .with_token(valid_token())
            .upload(file, "brief.pdf", "folder-9", Arc::new(move |p| sink.lock().unwrap().push(p)))
            .await
            .unwrap();

        assert_eq!(uploaded.id, "up1");
        assert_eq!(uploaded.web_view_link.as_deref(), Some("https://drive/up1"));
        assert_eq!(seen.lock().unwrap().last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn upload_error_uses_api_message() {
        let base = spawn(Router::new().route(
            "/upload",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({"error": {"message": "Insufficient permissions"}})),
                )
            }),
        ))
        .await;

        let file = RetrievedFile {
            bytes: vec![1, 2, 3],
            file_name: "x.bin".into(),
            content_type: "application/octet-stream".into(),
        };
        let err = drive(&base, None)
            .with_token(valid_token())
            .upload(file, "x.bin", "", Arc::new(|_| {}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: Insufficient permissions");
    }

    #[tokio::test]
    async fn sign_out_revokes_and_clears_token() {
        let revoked = Arc::new(Mutex::new(None::<String>));
        let record = revoked.clone();
        let base = spawn(Router::new().route(
            "/revoke",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let record = record.clone();
                async move {
                    *record.lock().unwrap() = form.get("token").cloned();
                    StatusCode::OK
                }
            }),
        ))
        .await;

        let drive = drive(&base, None).with_token(valid_token());
        assert!(drive.is_authenticated());
        drive.sign_out().await;
        assert!(!drive.is_authenticated());
        assert_eq!(revoked.lock().unwrap().as_deref(), Some("tok"));
    }
}
