//! Field mapping between board columns and the card's named fields.
//!
//! The [`FieldMap`] is an ordered title-to-key table declared once in
//! configuration. The [`FieldMapper`] projects an [`Item`] through it into
//! [`DisplayField`]s, recomputed on every render.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::{ColumnPayload, FileRef, Item};
use crate::errors::ConfigError;

/// Field keys with a fixed meaning to the card.
pub const STATUS_KEY: &str = "status";
pub const DATE_KEY: &str = "date";
pub const PERSON_KEY: &str = "person";
pub const FILES_KEY: &str = "files";
pub const DRIVE_LINK_KEY: &str = "driveLink";

/// Column type as inferred from an item's column shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    People,
    File,
    Status,
    Date,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::File => "file",
            Self::Status => "status",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "people" => Ok(Self::People),
            "file" => Ok(Self::File),
            "status" => Ok(Self::Status),
            "date" => Ok(Self::Date),
            "text" => Ok(Self::Text),
            _ => Err(format!("Invalid column type: {}", s)),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub key: String,
    pub title: String,
}

/// Ordered key → column title table. Keys are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<FieldMapping>,
}

impl FieldMap {
    pub fn new(entries: Vec<FieldMapping>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(ConfigError::DuplicateFieldKey {
                    key: entry.key.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Build from `(key, title)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(key, title)| FieldMapping {
                    key: key.to_string(),
                    title: title.to_string(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[FieldMapping] {
        &self.entries
    }

    pub fn title_for(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.title.as_str())
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        let entries = [
            ("clientName", "Name"),
            (PERSON_KEY, "Person"),
            (STATUS_KEY, "Status"),
            (DATE_KEY, "Date"),
            (DRIVE_LINK_KEY, "Drive Link"),
            (FILES_KEY, "Files"),
            ("notes", "Notes"),
        ]
        .into_iter()
        .map(|(key, title)| FieldMapping {
            key: key.to_string(),
            title: title.to_string(),
        })
        .collect();
        Self { entries }
    }
}

/// Per-render projection of one mapped column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayField {
    pub key: String,
    pub title: String,
    pub column_id: Option<String>,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_names: Option<Vec<String>>,
}

impl DisplayField {
    pub fn is_file(&self) -> bool {
        self.kind == ColumnType::File
    }
}

/// Reads items through an injected [`FieldMap`].
#[derive(Debug, Clone)]
pub struct FieldMapper {
    map: FieldMap,
    overrides: BTreeMap<String, ColumnType>,
}

impl FieldMapper {
    /// Create a mapper whose static type overrides come from the well-known
    /// keys (`status`, `date`, `person`, `files`) of `map`.
    pub fn new(map: FieldMap) -> Self {
        let mut overrides = BTreeMap::new();
        for (key, kind) in [
            (STATUS_KEY, ColumnType::Status),
            (DATE_KEY, ColumnType::Date),
            (PERSON_KEY, ColumnType::People),
            (FILES_KEY, ColumnType::File),
        ] {
            if let Some(title) = map.title_for(key) {
                overrides.entry(title.to_string()).or_insert(kind);
            }
        }
        Self { map, overrides }
    }

    /// Add title → type overrides on top of the built-in ones.
    pub fn with_overrides(mut self, extra: impl IntoIterator<Item = (String, ColumnType)>) -> Self {
        self.overrides.extend(extra);
        self
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.map
    }

    /// Text value of the column titled `title`: file names joined by `", "`
    /// for file columns, the rendered text otherwise, empty when absent.
    pub fn resolve_field(&self, item: &Item, title: &str) -> String {
        let Some(column) = item.column_by_title(title) else {
            return String::new();
        };
        if let Some(ColumnPayload::Files(_)) = column.payload() {
            return self.file_names(item, title).join(", ");
        }
        column.text.clone().unwrap_or_default()
    }

    pub fn resolve_column_id(&self, item: &Item, title: &str) -> Option<String> {
        item.column_by_title(title)
            .and_then(|c| c.column_id())
            .map(str::to_string)
    }

    /// Payload shape first, then the override table, else text.
    pub fn infer_type(&self, item: &Item, title: &str) -> ColumnType {
        let Some(column) = item.column_by_title(title) else {
            return ColumnType::Text;
        };
        match column.payload() {
            Some(ColumnPayload::People(_)) => ColumnType::People,
            Some(ColumnPayload::Files(_)) => ColumnType::File,
            None => self
                .overrides
                .get(title)
                .copied()
                .unwrap_or(ColumnType::Text),
        }
    }

    pub fn file_names(&self, item: &Item, title: &str) -> Vec<String> {
        item.column_by_title(title)
            .and_then(|c| c.files.as_ref())
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.name.clone())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Files of the column titled `title` that carry an asset id.
    pub fn file_refs(&self, item: &Item, title: &str) -> Vec<FileRef> {
        item.column_by_title(title)
            .and_then(|c| c.files.as_ref())
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| {
                        let asset_id = f.asset_id.clone().filter(|id| !id.is_empty())?;
                        Some(FileRef {
                            asset_id,
                            name: f.name.clone().unwrap_or_default(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One [`DisplayField`] per mapping entry, in mapping order, limited to
    /// columns present on the item.
    pub fn project_display_fields(&self, item: &Item) -> Vec<DisplayField> {
        self.map
            .entries()
            .iter()
            .filter(|entry| item.column_by_title(&entry.title).is_some())
            .map(|entry| {
                let kind = self.infer_type(item, &entry.title);
                DisplayField {
                    key: entry.key.clone(),
                    title: entry.title.clone(),
                    column_id: self.resolve_column_id(item, &entry.title),
                    value: self.resolve_field(item, &entry.title),
                    kind,
                    file_names: (kind == ColumnType::File)
                        .then(|| self.file_names(item, &entry.title)),
                }
            })
            .collect()
    }
}
