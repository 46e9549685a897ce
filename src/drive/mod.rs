//! Push an item's attachment to a Google Drive folder.
//!
//! | Module   | Responsibility                                              |
//! |----------|-------------------------------------------------------------|
//! | `flow`   | `DrivePushFlow` state machine, published over `watch`       |
//! | `google` | `GoogleDrive`: loopback OAuth, folder listing, upload       |
//! | `source` | `RelayFileSource`: fetches attachment bytes via the relay   |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DriveError;

pub mod flow;
pub mod google;
pub mod source;

pub use flow::{DrivePushFlow, DriveStep, PushTarget};
pub use google::GoogleDrive;
pub use source::RelayFileSource;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Receives upload progress as a percentage in `0.0..=100.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Entry returned by the folder picker. Only folders are valid targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedEntry {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub mime_type: String,
}

impl PickedEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn into_folder(self) -> DriveFolder {
        DriveFolder {
            id: self.id,
            name: self.name,
            url: self.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderPick {
    Picked(PickedEntry),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
}

/// Attachment bytes retrieved through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// A cloud drive the flow can authenticate against and upload to.
#[async_trait]
pub trait DriveProvider: Send + Sync {
    /// Check the provider is usable (credentials configured, APIs reachable).
    async fn initialize(&self) -> Result<(), DriveError>;

    fn is_authenticated(&self) -> bool;

    async fn authenticate(&self) -> Result<(), DriveError>;

    async fn pick_folder(&self) -> Result<FolderPick, DriveError>;

    async fn upload(
        &self,
        file: RetrievedFile,
        file_name: &str,
        folder_id: &str,
        progress: ProgressFn,
    ) -> Result<UploadedFile, DriveError>;

    async fn sign_out(&self);
}

/// Where attachment bytes come from.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn retrieve(&self, asset_id: &str) -> Result<RetrievedFile, DriveError>;
}
