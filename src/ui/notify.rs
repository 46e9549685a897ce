//! User-facing notifications.
//!
//! The item store reports outcomes through [`Notifier`]; the CLI renders
//! them with [`ConsoleNotifier`].

use std::time::Duration;

use console::{Term, style};

use super::icons::{CHECK, CROSS, INFO};

/// How long success notices stay up before dismissing themselves.
pub const SUCCESS_DISMISS_AFTER: Duration = Duration::from_secs(2);

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A single notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub text: String,
    /// `Some` for notices that dismiss themselves.
    pub dismiss_after: Option<Duration>,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            text: text.into(),
            dismiss_after: None,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            text: text.into(),
            dismiss_after: Some(SUCCESS_DISMISS_AFTER),
        }
    }

    pub fn info(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            text: text.into(),
            dismiss_after: None,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let line = match notice.kind {
            NoticeKind::Success => format!(
                "{}{} {}",
                CHECK,
                style(&notice.title).green().bold(),
                notice.text
            ),
            NoticeKind::Error => format!(
                "{}{} {}",
                CROSS,
                style(&notice.title).red().bold(),
                notice.text
            ),
            NoticeKind::Info => format!(
                "{}{} {}",
                INFO,
                style(&notice.title).cyan().bold(),
                notice.text
            ),
        };
        if Term::stderr().write_line(&line).is_err() {
            eprintln!("{}: {}", notice.title, notice.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_notice_auto_dismisses() {
        let notice = Notice::success("Item updated successfully.");
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.dismiss_after, Some(SUCCESS_DISMISS_AFTER));
    }

    #[test]
    fn error_notice_stays_up() {
        let notice = Notice::error("Item could not be fetched.");
        assert_eq!(notice.title, "Error");
        assert_eq!(notice.dismiss_after, None);
    }
}
