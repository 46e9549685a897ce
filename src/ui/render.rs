//! Plain-terminal rendering of an item card.

use console::style;

use super::icons::FILE;
use crate::board::fields::{ColumnType, DisplayField};
use crate::board::query::StatusLabel;

/// Colour family for a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Amber,
    Green,
    Red,
    Neutral,
}

pub fn status_tone(label: &str) -> Tone {
    match label.parse::<StatusLabel>() {
        Ok(StatusLabel::WorkingOnIt) => Tone::Amber,
        Ok(StatusLabel::Done) => Tone::Green,
        Ok(StatusLabel::Stuck) => Tone::Red,
        Err(_) => Tone::Neutral,
    }
}

pub fn styled_status(label: &str) -> String {
    let shown = if label.is_empty() { "-" } else { label };
    match status_tone(label) {
        Tone::Amber => style(shown).yellow().bold().to_string(),
        Tone::Green => style(shown).green().bold().to_string(),
        Tone::Red => style(shown).red().bold().to_string(),
        Tone::Neutral => style(shown).dim().to_string(),
    }
}

fn render_value(field: &DisplayField) -> String {
    match field.kind {
        ColumnType::Status => styled_status(&field.value),
        ColumnType::File => {
            let names = field.file_names.as_deref().unwrap_or_default();
            if names.is_empty() {
                style("no files").dim().to_string()
            } else {
                names
                    .iter()
                    .map(|n| format!("{}{}", FILE, n))
                    .collect::<Vec<_>>()
                    .join("  ")
            }
        }
        _ if field.value.is_empty() => style("-").dim().to_string(),
        _ => field.value.clone(),
    }
}

/// Item name as a heading followed by one aligned line per field.
pub fn render_card(item_name: &str, fields: &[DisplayField]) -> String {
    let width = fields.iter().map(|f| f.title.chars().count()).max().unwrap_or(0);
    let mut out = format!("{}\n", style(item_name).bold().underlined());
    for field in fields {
        let padding = " ".repeat(width - field.title.chars().count());
        out.push_str(&format!(
            "  {}{}  {}\n",
            style(&field.title).cyan(),
            padding,
            render_value(field)
        ));
    }
    out
}
