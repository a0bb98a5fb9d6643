use crate::store::{
    FileStore, GoogleSheetsStore, ImageKitStore, MemoryFileStore, MemoryTabularStore, StoreError,
    TabularStore,
};
use crate::timetable::DEFAULT_CLASSES;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_SQLITE_PATH: &str = "edutrack.sqlite3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("backend '{0}' is not available in this build")]
    Unsupported(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularBackend {
    Sheets,
    Sqlite,
    Memory,
}

impl FromStr for TabularBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google" => Ok(TabularBackend::Sheets),
            "sqlite" => Ok(TabularBackend::Sqlite),
            "memory" => Ok(TabularBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileBackend {
    ImageKit,
    Memory,
}

impl FromStr for FileBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imagekit" => Ok(FileBackend::ImageKit),
            "memory" => Ok(FileBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub tabular_backend: TabularBackend,
    pub spreadsheet_id: Option<String>,
    pub sheets_token: Option<String>,
    pub sqlite_path: PathBuf,
    pub file_backend: FileBackend,
    pub imagekit_private_key: Option<String>,
    pub imagekit_url_endpoint: Option<String>,
    pub rehydrate_slots: bool,
    pub classes: Vec<String>,
}

impl AppConfig {
    /// Reads the process environment, after loading a `.env` file if one
    /// exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_addr = parse_setting(
            "EDUTRACK_HTTP_ADDR",
            get("EDUTRACK_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
        )?;
        let tabular_backend = parse_setting(
            "EDUTRACK_TABULAR_BACKEND",
            get("EDUTRACK_TABULAR_BACKEND").unwrap_or_else(|| "sheets".to_string()),
        )?;
        let file_backend = parse_setting(
            "EDUTRACK_FILE_BACKEND",
            get("EDUTRACK_FILE_BACKEND").unwrap_or_else(|| "imagekit".to_string()),
        )?;
        let rehydrate_slots = match get("EDUTRACK_REHYDRATE_SLOTS") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "EDUTRACK_REHYDRATE_SLOTS",
                value: raw,
            })?,
        };
        let classes = match get("EDUTRACK_CLASSES") {
            None => DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            Some(raw) => {
                let classes: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                if classes.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "EDUTRACK_CLASSES",
                        value: raw,
                    });
                }
                classes
            }
        };

        Ok(Self {
            http_addr,
            tabular_backend,
            spreadsheet_id: get("SPREADSHEET_ID"),
            sheets_token: get("GOOGLE_SHEETS_TOKEN"),
            sqlite_path: get("EDUTRACK_SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH)),
            file_backend,
            imagekit_private_key: get("IMAGEKIT_PRIVATE_KEY"),
            imagekit_url_endpoint: get("IMAGEKIT_URL_ENDPOINT"),
            rehydrate_slots,
            classes,
        })
    }

    pub fn tabular_store(&self) -> Result<Arc<dyn TabularStore>, ConfigError> {
        match self.tabular_backend {
            TabularBackend::Sheets => {
                let id = self
                    .spreadsheet_id
                    .clone()
                    .ok_or(ConfigError::Missing("SPREADSHEET_ID"))?;
                let token = self
                    .sheets_token
                    .clone()
                    .ok_or(ConfigError::Missing("GOOGLE_SHEETS_TOKEN"))?;
                Ok(Arc::new(GoogleSheetsStore::new(id, token)))
            }
            #[cfg(feature = "sqlite")]
            TabularBackend::Sqlite => Ok(Arc::new(crate::store::SqliteTabularStore::new(
                &self.sqlite_path,
            )?)),
            #[cfg(not(feature = "sqlite"))]
            TabularBackend::Sqlite => Err(ConfigError::Unsupported("sqlite")),
            TabularBackend::Memory => Ok(Arc::new(MemoryTabularStore::new())),
        }
    }

    pub fn file_store(&self) -> Result<Arc<dyn FileStore>, ConfigError> {
        match self.file_backend {
            FileBackend::ImageKit => {
                let key = self
                    .imagekit_private_key
                    .clone()
                    .ok_or(ConfigError::Missing("IMAGEKIT_PRIVATE_KEY"))?;
                Ok(Arc::new(ImageKitStore::new(key)))
            }
            FileBackend::Memory => {
                let base = self
                    .imagekit_url_endpoint
                    .clone()
                    .unwrap_or_else(|| "memory://files".to_string());
                Ok(Arc::new(MemoryFileStore::new(base)))
            }
        }
    }
}

fn parse_setting<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    let parsed = raw.trim().parse::<T>();
    parsed.map_err(|_| ConfigError::Invalid { key, value: raw })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
