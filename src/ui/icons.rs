//! Shared UI icons and emojis.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i] ");

pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "- ");
pub static CLOUD: Emoji<'_, '_> = Emoji("☁️  ", "");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");
