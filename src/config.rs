//! Environment configuration

use crate::storage::{StorageConfig, DEFAULT_DOWNLOAD_BASE};
use crate::telegram;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COLLECTION: &str = "videos";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where media records are appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaBackend {
    /// Local SQLite file
    Sqlite(PathBuf),
    /// Firebase Realtime Database REST root
    Realtime {
        url: String,
        access_token: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub telegram_api_base: String,
    pub poll_timeout_secs: u64,
    pub storage: StorageConfig,
    pub media: MediaBackend,
    pub collection: String,
    pub work_dir: PathBuf,
    pub port: u16,
    /// Seconds a conversation runtime lingers without messages
    pub idle_timeout_secs: u64,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build the configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut storage = StorageConfig::new(required("STORAGE_BUCKET")?);
        if let Some(api_base) = get("STORAGE_API_BASE") {
            storage.api_base = api_base;
        }
        storage.download_base =
            get("STORAGE_DOWNLOAD_BASE").unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE.to_string());
        storage.access_token = get("STORAGE_ACCESS_TOKEN");

        let media = match get("DATABASE_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                MediaBackend::Realtime {
                    url,
                    access_token: get("DATABASE_ACCESS_TOKEN"),
                }
            }
            Some(path) => MediaBackend::Sqlite(PathBuf::from(path)),
            None => {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                MediaBackend::Sqlite(PathBuf::from(format!("{home}/.upload-bot/media.db")))
            }
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            telegram_api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| telegram::DEFAULT_API_BASE.to_string()),
            poll_timeout_secs: parse_or(
                "TELEGRAM_POLL_TIMEOUT_SECS",
                get("TELEGRAM_POLL_TIMEOUT_SECS"),
                DEFAULT_POLL_TIMEOUT_SECS,
            )?,
            storage,
            media,
            collection: get("MEDIA_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            work_dir: get("WORK_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            idle_timeout_secs: parse_or(
                "CONVERSATION_IDLE_SECS",
                get("CONVERSATION_IDLE_SECS"),
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
