//! Terminal rendering of the drive push steps, driven by the flow's `watch`
//! channel. Upload progress is shown with an `indicatif` bar; every other
//! step is a spinner line.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::icons::{CHECK, CLOUD, CROSS, FOLDER, KEY};
use crate::drive::DriveStep;

/// Headline for each step.
pub fn step_label(step: &DriveStep) -> &'static str {
    match step {
        DriveStep::Loading => "Loading...",
        DriveStep::Auth => "Connect to Google Drive",
        DriveStep::Folder => "Select Destination Folder",
        DriveStep::Upload { .. } => "Uploading to Google Drive...",
        DriveStep::Success { .. } => "Upload Successful!",
        DriveStep::Error { .. } => "Upload Failed",
    }
}

/// Single progress line that switches between spinner and bar.
pub struct StepProgress {
    bar: ProgressBar,
    uploading: bool,
}

impl Default for StepProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            uploading: false,
        }
    }

    pub fn render(&mut self, step: &DriveStep) {
        match step {
            DriveStep::Loading => self.spin(step_label(step).to_string()),
            DriveStep::Auth => self.spin(format!("{}{}", KEY, step_label(step))),
            DriveStep::Folder => self.spin(format!("{}{}", FOLDER, step_label(step))),
            DriveStep::Upload { folder, progress } => {
                if !self.uploading {
                    self.uploading = true;
                    self.bar.set_style(bar_style());
                    self.bar.set_length(100);
                    self.bar.set_prefix(format!("{}{}", CLOUD, folder.name));
                }
                self.bar.set_position(progress.round().clamp(0.0, 100.0) as u64);
            }
            DriveStep::Success { file, folder } => {
                let link = file.web_view_link.as_deref().unwrap_or_default();
                self.bar.set_style(message_style());
                self.bar.finish_with_message(format!(
                    "{}{} {} uploaded to {} {}",
                    CHECK,
                    style(step_label(step)).green().bold(),
                    file.name,
                    folder.name,
                    style(link).dim()
                ));
            }
            DriveStep::Error { message } => {
                self.bar.set_style(message_style());
                self.bar.abandon_with_message(format!(
                    "{}{}",
                    CROSS,
                    style(step_label(step)).red().bold()
                ));
                debug!(%message, "upload ended in error");
            }
        }
    }

    fn spin(&mut self, message: String) {
        if self.uploading {
            self.uploading = false;
            self.bar.set_style(spinner_style());
        }
        self.bar.set_message(message);
    }

    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .expect("progress bar template is a valid static string")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}%")
        .expect("progress bar template is a valid static string")
        .progress_chars("█▓▒░")
}

fn message_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .expect("progress bar template is a valid static string")
}

/// Render the upload published on `rx`: steps before the upload starts are
/// left to the caller, which may be showing prompts. Ends at success, error
/// or when the channel closes.
pub fn follow(mut rx: watch::Receiver<DriveStep>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress: Option<StepProgress> = None;
        loop {
            let step = rx.borrow_and_update().clone();
            match &step {
                DriveStep::Upload { .. } => {
                    progress.get_or_insert_with(StepProgress::new).render(&step);
                }
                DriveStep::Success { .. } | DriveStep::Error { .. } => {
                    if let Some(p) = progress.as_mut() {
                        p.render(&step);
                        break;
                    }
                }
                _ => {}
            }
            if rx.changed().await.is_err() {
                if let Some(p) = progress {
                    p.clear();
                }
                break;
            }
        }
    })
}
