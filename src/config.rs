//! Layered configuration: built-in defaults, then `boardcard.toml`, then
//! environment variables (`.env` is loaded first). Command-line flags are
//! applied on top by the caller.
//!
//! # Configuration File Format
//!
//! ```toml
//! [relay]
//! port = 8080
//! client_url = "http://localhost:3000"
//!
//! [platform]
//! api_url = "https://api.monday.com/v2"
//! api_version = "2023-10"
//! board_id = "1234567890"
//!
//! [[fields]]
//! key = "status"
//! title = "Status"
//!
//! [[fields]]
//! key = "files"
//! title = "Files"
//!
//! [types]
//! "Owner" = "people"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::api::{DEFAULT_API_URL, DEFAULT_API_VERSION};
use crate::board::fields::{ColumnType, FieldMap, FieldMapper, FieldMapping};
use crate::drive::source::DEFAULT_RELAY_URL;
use crate::errors::ConfigError;
use crate::relay::server::{DEFAULT_CLIENT_URL, DEFAULT_PORT, ServerConfig};

pub const CONFIG_FILE_NAME: &str = "boardcard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelaySection {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub client_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformSection {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub board_id: Option<String>,
}

/// Contents of `boardcard.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub platform: PlatformSection,
    /// Ordered field mapping table; empty means the built-in table.
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    /// Extra column title → type overrides.
    #[serde(default)]
    pub types: BTreeMap<String, ColumnType>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Places searched for a config file when none is given explicitly.
pub fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("boardcard").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub relay: ServerConfig,
    pub api_key: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub board_id: Option<String>,
    pub item_id: Option<String>,
    pub proxy_url: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub field_map: FieldMap,
    pub type_overrides: BTreeMap<String, ColumnType>,
    /// Config file the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load `.env`, the config file (explicit path, else the first default
    /// location that exists) and the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_locations().into_iter().find(|p| p.is_file()),
        };
        let file = match &source {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let mut settings = Self::resolve(file, |name| std::env::var(name).ok())?;
        settings.source = source;
        Ok(settings)
    }

    /// Merge `file` with values from `env`. Empty variables count as unset.
    pub fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PROXY_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                name: "PROXY_PORT".into(),
                value: raw,
            })?,
            None => file.relay.port.unwrap_or(DEFAULT_PORT),
        };

        let field_map = if file.fields.is_empty() {
            FieldMap::default()
        } else {
            FieldMap::new(file.fields)?
        };

        Ok(Self {
            relay: ServerConfig {
                port,
                client_url: var("CLIENT_URL")
                    .or(file.relay.client_url)
                    .unwrap_or_else(|| DEFAULT_CLIENT_URL.to_string()),
            },
            api_key: var("MONDAY_API_KEY").or_else(|| var("REACT_APP_MONDAY_USER_API_KEY")),
            api_url: var("MONDAY_API_URL")
                .or(file.platform.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_version: file
                .platform
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            board_id: var("BOARD_ID").or(file.platform.board_id),
            item_id: var("ITEM_ID"),
            proxy_url: var("PROXY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            google_client_id: var("GOOGLE_CLIENT_ID"),
            google_client_secret: var("GOOGLE_CLIENT_SECRET"),
            field_map,
            type_overrides: file.types,
            source: None,
        })
    }

    /// Field mapper over the configured table and type overrides.
    pub fn mapper(&self) -> FieldMapper {
        FieldMapper::new(self.field_map.clone()).with_overrides(self.type_overrides.clone())
    }

    /// API key with all but the last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_deref().map(mask)
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(8), visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let settings = Settings::resolve(ConfigFile::default(), env_from(&[])).unwrap();
        assert_eq!(settings.relay.port, 8080);
        assert_eq!(settings.relay.client_url, "http://localhost:3000");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.api_version, "2023-10");
        assert_eq!(settings.proxy_url, "http://localhost:8080");
        assert!(settings.api_key.is_none());
        assert_eq!(settings.field_map, FieldMap::default());
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile::parse(
            "[relay]\nport = 9000\nclient_url = \"http://file\"\n[platform]\nboard_id = \"1\"\n",
            Path::new("boardcard.toml"),
        )
        .unwrap();
        let settings = Settings::resolve(
            file,
            env_from(&[("PROXY_PORT", "9100"), ("BOARD_ID", "2"), ("ITEM_ID", "42")]),
        )
        .unwrap();
        assert_eq!(settings.relay.port, 9100);
        assert_eq!(settings.relay.client_url, "http://file");
        assert_eq!(settings.board_id.as_deref(), Some("2"));
        assert_eq!(settings.item_id.as_deref(), Some("42"));
    }

    #[test]
    fn api_key_falls_back_to_widget_variable() {
        let settings = Settings::resolve(
            ConfigFile::default(),
            env_from(&[("MONDAY_API_KEY", ""), ("REACT_APP_MONDAY_USER_API_KEY", "legacy")]),
        )
        .unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("legacy"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Settings::resolve(ConfigFile::default(), env_from(&[("PROXY_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name, .. } if name == "PROXY_PORT"));
    }

    #[test]
    fn fields_and_types_from_file() {
        let file = ConfigFile::parse(
            r#"
[[fields]]
key = "owner"
title = "Owner"

[[fields]]
key = "status"
title = "Stage"

[types]
"Owner" = "people"
"#,
            Path::new("boardcard.toml"),
        )
        .unwrap();
        let settings = Settings::resolve(file, env_from(&[])).unwrap();
        let keys: Vec<_> = settings.field_map.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["owner", "status"]);
        assert_eq!(settings.type_overrides.get("Owner"), Some(&ColumnType::People));
        assert_eq!(settings.mapper().field_map().title_for("status"), Some("Stage"));
    }

    #[test]
    fn duplicate_field_keys_are_an_error() {
        let file = ConfigFile::parse(
            "[[fields]]\nkey = \"a\"\ntitle = \"A\"\n[[fields]]\nkey = \"a\"\ntitle = \"B\"\n",
            Path::new("boardcard.toml"),
        )
        .unwrap();
        let err = Settings::resolve(file, env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFieldKey { .. }));
    }

    #[test]
    fn unknown_column_type_fails_to_parse() {
        let err = ConfigFile::parse("[types]\n\"X\" = \"rainbow\"\n", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[relay]\nport = 7070\n").unwrap();
        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.relay.port, Some(7070));
    }

    #[test]
    fn load_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigFile::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn masks_api_key() {
        let mut settings = Settings::resolve(ConfigFile::default(), env_from(&[])).unwrap();
        assert_eq!(settings.masked_api_key(), None);
        settings.api_key = Some("abcdefghijkl".into());
        assert_eq!(settings.masked_api_key().as_deref(), Some("********ijkl"));
        settings.api_key = Some("abc".into());
        assert_eq!(settings.masked_api_key().as_deref(), Some("***"));
    }
}
