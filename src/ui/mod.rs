pub mod icons;
pub mod notify;
pub mod progress;
pub mod render;

pub use notify::{ConsoleNotifier, Notice, NoticeKind, Notifier};
pub use progress::{StepProgress, follow};
pub use render::{render_card, styled_status};
