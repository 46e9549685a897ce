//! Typed error hierarchy for boardcard.
//!
//! Three top-level enums cover the three subsystems:
//! - `PlatformError`: monday.com API transport and payload failures
//! - `DriveError`: Google Drive authentication, picking and upload failures
//! - `ConfigError`: configuration file and environment failures

use thiserror::Error;

/// Errors from the platform (monday.com) API client.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Platform API key is not configured")]
    MissingApiKey,

    #[error("Failed to reach platform API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Platform API returned HTTP {status}")]
    Status { status: u16 },

    #[error("Platform API error: {0}")]
    Payload(String),

    #[error("Failed to decode platform API response: {0}")]
    Decode(String),
}

impl PlatformError {
    /// HTTP status carried by this error, when the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PlatformError::Status { status } => Some(*status),
            PlatformError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the platform refused access to the requested resource.
    pub fn is_forbidden(&self) -> bool {
        self.status_code() == Some(403)
    }
}

/// Errors from the Drive push flow.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Google client id is not configured")]
    MissingClientId,

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("User cancelled folder selection")]
    FolderCancelled,

    #[error("Please select a folder, not a file.")]
    NotAFolder,

    #[error("Missing folder or file information")]
    MissingTarget,

    #[error("{0}")]
    Retrieval(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Google API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {message}")]
    Parse {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Duplicate field key '{key}' in field mapping")]
    DuplicateFieldKey { key: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}
