//! Drive push command: `boardcard push`.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use console::style;
use dialoguer::{Confirm, Select};
use tracing::warn;

use boardcard::board::models::FileRef;
use boardcard::config::Settings;
use boardcard::drive::google::DriveInteraction;
use boardcard::drive::{DrivePushFlow, DriveStep, GoogleDrive, PickedEntry, PushTarget, RelayFileSource};
use boardcard::ui::follow;
use boardcard::ui::icons::{FILE, FOLDER, KEY};

use super::item::open_card;

/// Browser consent and folder picking on the terminal.
struct TerminalInteraction;

impl DriveInteraction for TerminalInteraction {
    fn open_consent(&self, url: &str) {
        eprintln!("{}Sign in with Google in your browser.", KEY);
        eprintln!("  If it doesn't open, visit: {}", style(url).underlined());
        if let Err(e) = open::that(url) {
            warn!(error = %e, "failed to open browser");
        }
    }

    fn choose_folder(&self, entries: &[PickedEntry]) -> Option<usize> {
        let items: Vec<String> = entries.iter().map(|e| format!("{}{}", FOLDER, e.name)).collect();
        Select::new()
            .with_prompt("Select destination folder (Esc to cancel)")
            .items(&items)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()
    }
}

fn choose_file(files: &[FileRef], wanted: Option<&str>) -> Result<FileRef> {
    if let Some(name) = wanted {
        return files
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| anyhow!("No file named '{}' on this item", name));
    }
    if let [only] = files {
        return Ok(only.clone());
    }

    let items: Vec<String> = files.iter().map(|f| format!("{}{}", FILE, f.name)).collect();
    let choice = tokio::task::block_in_place(|| {
        Select::new()
            .with_prompt("File to push")
            .items(&items)
            .default(0)
            .interact_opt()
    })?;
    match choice {
        Some(index) => Ok(files[index].clone()),
        None => bail!("No file selected"),
    }
}

fn ask_retry() -> bool {
    tokio::task::block_in_place(|| {
        Confirm::new()
            .with_prompt("Try again?")
            .default(false)
            .interact()
            .unwrap_or(false)
    })
}

pub async fn cmd_push(settings: &Settings, file: Option<&str>, sign_out: bool) -> Result<()> {
    let card = open_card(settings).await?;
    let files = card.files();
    if files.is_empty() {
        bail!("This item has no files to push");
    }
    let chosen = choose_file(&files, file)?;

    let provider = Arc::new(GoogleDrive::new(
        settings.google_client_id.clone(),
        settings.google_client_secret.clone(),
        Arc::new(TerminalInteraction),
    ));
    let source = Arc::new(RelayFileSource::new(&settings.proxy_url));
    let mut flow = DrivePushFlow::new(provider, source);
    let mut renderer = follow(flow.subscribe());

    let mut step = flow
        .open(PushTarget::new(chosen.asset_id, Some(chosen.name)))
        .await;

    let outcome = loop {
        step = match step {
            DriveStep::Auth => flow.authenticate().await,
            DriveStep::Folder => {
                let next = flow.select_folder().await;
                if next == DriveStep::Folder {
                    println!("Folder selection cancelled");
                    break Ok(());
                }
                next
            }
            DriveStep::Success { .. } => break Ok(()),
            DriveStep::Error { message } => {
                eprintln!("{} {}", style("Error:").red().bold(), message);
                if ask_retry() {
                    if renderer.is_finished() {
                        renderer = follow(flow.subscribe());
                    }
                    flow.retry()
                } else {
                    break Err(anyhow!("Push to Google Drive failed"));
                }
            }
            // Loading and Upload are transient and never returned by the flow.
            DriveStep::Loading | DriveStep::Upload { .. } => break Ok(()),
        };
    };

    if sign_out {
        flow.sign_out().await;
        println!("Signed out of Google Drive");
    }
    flow.close();
    drop(flow);
    if let Err(e) = renderer.await {
        warn!(error = %e, "progress renderer stopped unexpectedly");
    }
    outcome
}
