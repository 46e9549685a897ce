//! Drive push state machine.
//!
//! `loading → auth → folder → upload → success`, with `error` reachable from
//! any step. The current step is published on a `watch` channel so a
//! renderer can follow along, including upload progress.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::{DriveFolder, DriveProvider, FileSource, FolderPick, ProgressFn, UploadedFile};
use crate::errors::DriveError;

const DEFAULT_FILE_NAME: &str = "file";

#[derive(Debug, Clone, PartialEq)]
pub enum DriveStep {
    Loading,
    Auth,
    Folder,
    Upload { folder: DriveFolder, progress: f64 },
    Success { file: UploadedFile, folder: DriveFolder },
    Error { message: String },
}

impl DriveStep {
    pub fn name(&self) -> &'static str {
        match self {
            DriveStep::Loading => "loading",
            DriveStep::Auth => "auth",
            DriveStep::Folder => "folder",
            DriveStep::Upload { .. } => "upload",
            DriveStep::Success { .. } => "success",
            DriveStep::Error { .. } => "error",
        }
    }
}

/// The attachment being pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub asset_id: String,
    pub file_name: Option<String>,
}

impl PushTarget {
    pub fn new(asset_id: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            file_name,
        }
    }
}

pub struct DrivePushFlow {
    provider: Arc<dyn DriveProvider>,
    source: Arc<dyn FileSource>,
    target: Option<PushTarget>,
    selected: Option<DriveFolder>,
    authenticated: bool,
    step: Arc<watch::Sender<DriveStep>>,
}

impl DrivePushFlow {
    pub fn new(provider: Arc<dyn DriveProvider>, source: Arc<dyn FileSource>) -> Self {
        let (tx, _rx) = watch::channel(DriveStep::Loading);
        Self {
            provider,
            source,
            target: None,
            selected: None,
            authenticated: false,
            step: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DriveStep> {
        self.step.subscribe()
    }

    pub fn step(&self) -> DriveStep {
        self.step.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn selected_folder(&self) -> Option<&DriveFolder> {
        self.selected.as_ref()
    }

    fn set(&self, step: DriveStep) -> DriveStep {
        self.step.send_replace(step.clone());
        step
    }

    fn fail(&self, context: &str, err: DriveError) -> DriveStep {
        error!(error = %err, "{}", context);
        self.set(DriveStep::Error {
            message: err.to_string(),
        })
    }

    /// Enter the flow for `target`.
    #[instrument(skip(self), fields(asset_id = %target.asset_id))]
    pub async fn open(&mut self, target: PushTarget) -> DriveStep {
        self.reset();
        self.target = Some(target);

        if let Err(e) = self.provider.initialize().await {
            return self.fail("drive initialization failed", e);
        }

        self.authenticated = self.provider.is_authenticated();
        if self.authenticated {
            self.set(DriveStep::Folder)
        } else {
            self.set(DriveStep::Auth)
        }
    }

    pub async fn authenticate(&mut self) -> DriveStep {
        self.set(DriveStep::Loading);
        match self.provider.authenticate().await {
            Ok(()) => {
                self.authenticated = true;
                self.set(DriveStep::Folder)
            }
            Err(e) => self.fail("authentication failed", e),
        }
    }

    /// Show the picker; a chosen folder starts the upload straight away.
    pub async fn select_folder(&mut self) -> DriveStep {
        self.set(DriveStep::Loading);
        let entry = match self.provider.pick_folder().await {
            Ok(FolderPick::Picked(entry)) => entry,
            Ok(FolderPick::Cancelled) => return self.set(DriveStep::Folder),
            Err(e) => return self.fail("folder selection failed", e),
        };

        if !entry.is_folder() {
            return self.fail("folder selection failed", DriveError::NotAFolder);
        }

        let folder = entry.into_folder();
        self.selected = Some(folder.clone());
        self.upload(folder).await
    }

    pub async fn upload(&mut self, folder: DriveFolder) -> DriveStep {
        let target = match &self.target {
            Some(t) if !t.asset_id.is_empty() && !folder.id.is_empty() => t.clone(),
            _ => return self.fail("upload not started", DriveError::MissingTarget),
        };

        self.set(DriveStep::Upload {
            folder: folder.clone(),
            progress: 0.0,
        });

        match self.push(&target, &folder).await {
            Ok(file) => {
                info!(file_id = %file.id, folder = %folder.name, "pushed file to drive");
                self.set(DriveStep::Success { file, folder })
            }
            Err(e) => self.fail("upload failed", e),
        }
    }

    async fn push(
        &mut self,
        target: &PushTarget,
        folder: &DriveFolder,
    ) -> Result<UploadedFile, DriveError> {
        if !self.provider.is_authenticated() {
            self.provider.authenticate().await?;
            self.authenticated = true;
        }

        let file = self.source.retrieve(&target.asset_id).await?;
        let file_name = target
            .file_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| Some(file.file_name.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        let step = self.step.clone();
        let progress: ProgressFn = Arc::new(move |pct| {
            step.send_modify(|s| {
                if let DriveStep::Upload { progress, .. } = s {
                    *progress = pct;
                }
            });
        });

        self.provider
            .upload(file, &file_name, &folder.id, progress)
            .await
    }

    /// Leave the error step for whichever step the auth state allows.
    pub fn retry(&mut self) -> DriveStep {
        if self.authenticated {
            self.set(DriveStep::Folder)
        } else {
            self.set(DriveStep::Auth)
        }
    }

    pub async fn sign_out(&mut self) -> DriveStep {
        self.provider.sign_out().await;
        self.authenticated = false;
        self.set(DriveStep::Auth)
    }

    pub fn close(&mut self) -> DriveStep {
        self.reset();
        self.step()
    }

    fn reset(&mut self) {
        self.target = None;
        self.selected = None;
        self.authenticated = false;
        self.set(DriveStep::Loading);
    }
}
