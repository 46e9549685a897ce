//! GraphQL documents for reading and mutating board items.
//!
//! Mutations embed the column values as a single JSON object inside a
//! GraphQL string argument, so every rendered fragment is escaped once more
//! before it lands in the template.

use std::str::FromStr;

use serde_json::Value;

use super::fields::ColumnType;

/// Group new items are created in.
pub const DEFAULT_GROUP_ID: &str = "topics";

/// Column id of the status column targeted by [`status_update_mutation`].
pub const STATUS_COLUMN_ID: &str = "status";

/// Item read query. Takes `$ids: [ID!]`.
pub const ITEM_QUERY: &str = "query ($ids: [ID!]) { items(ids: $ids) { id name column_values { id text column { id title } \
... on PeopleValue { persons_and_teams { id kind } } \
... on FileValue { files { ... on FileAssetValue { asset_id name } } } } } }";

/// Asset resolution query used by the relay. Takes `$ids: [ID!]!`.
pub const ASSET_QUERY: &str =
    "query ($ids: [ID!]!) { assets(ids: $ids) { id name url public_url } }";

/// How a column value is rendered into the mutation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    BoardRelation,
    Hour,
    Checkbox,
    Status,
    People,
    Email,
    Timeline,
    Other(String),
}

impl ColumnKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BoardRelation => "board_relation",
            Self::Hour => "hour",
            Self::Checkbox => "checkbox",
            Self::Status => "status",
            Self::People => "people",
            Self::Email => "email",
            Self::Timeline => "timeline",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for ColumnKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "board_relation" => Self::BoardRelation,
            "hour" => Self::Hour,
            "checkbox" => Self::Checkbox,
            "status" => Self::Status,
            "people" => Self::People,
            "email" => Self::Email,
            "timeline" => Self::Timeline,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<ColumnType> for ColumnKind {
    fn from(kind: ColumnType) -> Self {
        match kind {
            ColumnType::Status => Self::Status,
            ColumnType::People => Self::People,
            other => Self::Other(other.as_str().to_string()),
        }
    }
}

/// New value for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPatch {
    pub kind: ColumnKind,
    pub value: Value,
}

impl ColumnPatch {
    pub fn new(kind: ColumnKind, value: impl Into<Value>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Column id → new value, in insertion order. `None` entries are dropped
/// when rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValuePatch {
    entries: Vec<(String, Option<ColumnPatch>)>,
}

impl ColumnValuePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(column_id: impl Into<String>, kind: ColumnKind, value: impl Into<Value>) -> Self {
        Self::new().with(column_id, ColumnPatch::new(kind, value))
    }

    pub fn with(mut self, column_id: impl Into<String>, patch: ColumnPatch) -> Self {
        self.entries.push((column_id.into(), Some(patch)));
        self
    }

    pub fn with_null(mut self, column_id: impl Into<String>) -> Self {
        self.entries.push((column_id.into(), None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render to the escaped column-values string (without the enclosing
    /// braces) ready to embed in a mutation.
    pub fn render(&self) -> String {
        let joined = self
            .entries
            .iter()
            .filter_map(|(id, patch)| patch.as_ref().map(|p| (id, p)))
            .filter_map(|(id, patch)| render_entry(id, patch))
            .collect::<Vec<_>>()
            .join(", ");
        escape_graphql(&joined)
    }
}

impl FromIterator<(String, Option<ColumnPatch>)> for ColumnValuePatch {
    fn from_iter<T: IntoIterator<Item = (String, Option<ColumnPatch>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Labels understood by the status-only mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    WorkingOnIt,
    Done,
    Stuck,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 3] = [Self::WorkingOnIt, Self::Done, Self::Stuck];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkingOnIt => "Working on it",
            Self::Done => "Done",
            Self::Stuck => "Stuck",
        }
    }
}

impl FromStr for StatusLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Working on it" => Ok(Self::WorkingOnIt),
            "Done" => Ok(Self::Done),
            "Stuck" => Ok(Self::Stuck),
            _ => Err(format!("Invalid status label: {}", s)),
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn create_item_mutation(
    board_id: &str,
    group_id: &str,
    item_name: &str,
    values: &ColumnValuePatch,
) -> String {
    format!(
        "mutation {{ create_item (board_id: {}, group_id: {}, item_name: {}, column_values: \"{{{}}}\") {{ id }} }}",
        graphql_string(board_id),
        graphql_string(group_id),
        graphql_string(item_name),
        values.render()
    )
}

pub fn update_item_mutation(board_id: &str, item_id: &str, values: &ColumnValuePatch) -> String {
    format!(
        "mutation {{ change_multiple_column_values (board_id: {}, item_id: {}, column_values: \"{{{}}}\") {{ id }} }}",
        graphql_string(board_id),
        graphql_string(item_id),
        values.render()
    )
}

pub fn delete_item_mutation(item_id: &str) -> String {
    format!(
        "mutation {{ delete_item (item_id: {}) {{ id }} }}",
        graphql_string(item_id)
    )
}

/// Status-only update. Unrecognised labels produce an empty column-values
/// argument, which the platform treats as a no-op.
pub fn status_update_mutation(board_id: &str, item_id: &str, label: &str) -> String {
    let values = match label.parse::<StatusLabel>() {
        Ok(label) => format!(
            "{{{}}}",
            ColumnValuePatch::single(STATUS_COLUMN_ID, ColumnKind::Status, label.as_str())
                .render()
        ),
        Err(_) => String::new(),
    };
    format!(
        "mutation {{ change_multiple_column_values (board_id: {}, item_id: {}, column_values: \"{}\") {{ id }} }}",
        graphql_string(board_id),
        graphql_string(item_id),
        values
    )
}

fn render_entry(column_id: &str, patch: &ColumnPatch) -> Option<String> {
    let key = json_string(column_id);
    let value = &patch.value;
    let body = match &patch.kind {
        ColumnKind::BoardRelation => format!(
            "{{\"linkedPulseIds\":[{{\"linkedPulseId\":{}}}]}}",
            json_id(value)
        ),
        ColumnKind::Hour => {
            let text = text_of(value);
            let (hours, minutes) = text.split_once(':')?;
            format!(
                "{{\"hour\":{},\"minute\":{}}}",
                parse_leading_int(hours)?,
                parse_leading_int(minutes)?
            )
        }
        ColumnKind::Checkbox => {
            if truthy(value) {
                "{\"checked\":\"true\"}".to_string()
            } else {
                "null".to_string()
            }
        }
        ColumnKind::Status => {
            if !truthy(value) {
                return None;
            }
            format!("{{\"label\":{}}}", json_string(&text_of(value)))
        }
        ColumnKind::People => {
            if !truthy(value) {
                return None;
            }
            format!(
                "{{\"personsAndTeams\":[{{\"id\":{},\"kind\":\"person\"}}]}}",
                json_string(&text_of(value))
            )
        }
        ColumnKind::Email => {
            let text = json_string(&text_of(value));
            format!("{{\"email\":{},\"text\":{}}}", text, text)
        }
        ColumnKind::Timeline => format!(
            "{{\"from\":{},\"to\":{}}}",
            json_string(&value.get("from").map(text_of).unwrap_or_default()),
            json_string(&value.get("to").map(text_of).unwrap_or_default())
        ),
        ColumnKind::Other(_) => json_string(&text_of(value)),
    };
    Some(format!("{}:{}", key, body))
}

/// Escape for embedding inside a double-quoted GraphQL string.
pub fn escape_graphql(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn graphql_string(raw: &str) -> String {
    format!("\"{}\"", escape_graphql(raw))
}

fn json_string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

fn json_id(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => {
            let text = text_of(other);
            match text.trim().parse::<u64>() {
                Ok(n) => n.to_string(),
                Err(_) => json_string(&text),
            }
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits; trailing
/// garbage is ignored. No digits means no number.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}
