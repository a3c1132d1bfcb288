//! Configuration for the chat store and its backends.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable overriding [`StorageConfig::sqlite_path`].
pub const ENV_SQLITE_PATH: &str = "MESSENGER_SQLITE_PATH";
/// Environment variable overriding [`BlobConfig::root`].
pub const ENV_BLOB_ROOT: &str = "MESSENGER_BLOB_ROOT";
/// Environment variable setting [`BlobConfig::public_base_url`].
pub const ENV_BLOB_BASE_URL: &str = "MESSENGER_BLOB_BASE_URL";
/// Environment variable overriding [`DateFormatConfig::utc_offset_seconds`].
pub const ENV_UTC_OFFSET_SECONDS: &str = "MESSENGER_UTC_OFFSET_SECONDS";

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Document backend settings.
    pub storage: StorageConfig,
    /// Blob store settings.
    pub blob: BlobConfig,
    /// Wire date settings.
    pub dates: DateFormatConfig,
}

impl ChatConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.storage.documents_table.is_empty()
            || !self
                .storage
                .documents_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ChatError::InvalidConfig(format!(
                "storage.documents_table {:?} must be a non-empty identifier",
                self.storage.documents_table
            )));
        }

        if let Some(base_url) = &self.blob.public_base_url {
            Url::parse(base_url)
                .map_err(|err| ChatError::InvalidConfig(format!("blob.public_base_url: {err}")))?;
        }

        if FixedOffset::east_opt(self.dates.utc_offset_seconds).is_none() {
            return Err(ChatError::InvalidConfig(format!(
                "dates.utc_offset_seconds {} is out of range",
                self.dates.utc_offset_seconds
            )));
        }

        if StrftimeItems::new(&self.dates.pattern).any(|item| matches!(item, Item::Error)) {
            return Err(ChatError::InvalidConfig(format!(
                "dates.pattern {:?} is not a valid format",
                self.dates.pattern
            )));
        }

        Ok(())
    }

    /// Read a JSON configuration file. Missing sections take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> ChatResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ChatError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            ChatError::InvalidConfig(format!("cannot parse {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the `MESSENGER_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable holds an invalid value.
    pub fn from_env() -> ChatResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var(ENV_SQLITE_PATH) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Ok(root) = std::env::var(ENV_BLOB_ROOT) {
            config.blob.root = PathBuf::from(root);
        }
        if let Ok(base_url) = std::env::var(ENV_BLOB_BASE_URL) {
            config.blob.public_base_url = Some(base_url);
        }
        if let Ok(offset) = std::env::var(ENV_UTC_OFFSET_SECONDS) {
            config.dates.utc_offset_seconds = offset.parse().map_err(|_| {
                ChatError::InvalidConfig(format!("{ENV_UTC_OFFSET_SECONDS}={offset} is not an integer"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Document backend settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Table holding one JSON document per path.
    pub documents_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("messenger.sqlite"),
            documents_table: "documents".to_string(),
        }
    }
}

/// Blob store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Directory under which blob paths are written.
    pub root: PathBuf,
    /// Base URL serving `root`; `file://` URLs are returned when unset.
    pub public_base_url: Option<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("blobs"),
            public_base_url: None,
        }
    }
}

/// How dates are spelled in stored documents and message ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormatConfig {
    /// `chrono` strftime pattern; `.` is stripped from the output.
    pub pattern: String,
    /// Offset east of UTC used for rendering, in seconds.
    pub utc_offset_seconds: i32,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            pattern: "%b %-d, %Y at %-I:%M:%S %p %Z".to_string(),
            utc_offset_seconds: 0,
        }
    }
}
