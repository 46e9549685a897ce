use serde::{Deserialize, Deserializer, Serialize};

/// A board item as returned by the platform read query.
///
/// Replaced wholesale on every successful fetch; nothing here is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnEntry>,
}

impl Item {
    /// First column whose title matches. Duplicate titles resolve to the
    /// earliest column in the item's native order.
    pub fn column_by_title(&self, title: &str) -> Option<&ColumnEntry> {
        self.column_values
            .iter()
            .find(|col| col.title() == Some(title))
    }
}

/// One column value container on an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub column: Option<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons_and_teams: Option<Vec<PersonRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileAsset>>,
}

impl ColumnEntry {
    pub fn title(&self) -> Option<&str> {
        self.column.as_ref().map(|c| c.title.as_str())
    }

    /// Identifier used when issuing updates. Falls back to the column
    /// definition's id when the value container carries none.
    pub fn column_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.column.as_ref().and_then(|c| c.id.as_deref()))
            .filter(|id| !id.is_empty())
    }

    pub fn payload(&self) -> Option<ColumnPayload<'_>> {
        if let Some(people) = &self.persons_and_teams {
            return Some(ColumnPayload::People(people));
        }
        self.files.as_deref().map(ColumnPayload::Files)
    }
}

/// Typed sub-payload carried by some columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnPayload<'a> {
    People(&'a [PersonRef]),
    Files(&'a [FileAsset]),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileAsset {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A file attachment that can be fetched through the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRef {
    pub asset_id: String,
    pub name: String,
}

/// An asset record as resolved by the relay's asset query.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Asset {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Asset {
    /// The authenticated URL when present, else the public one.
    pub fn download_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.public_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|u| !u.is_empty())
    }
}

// The platform returns ids as strings, but hand-written fixtures and older
// API versions use numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
