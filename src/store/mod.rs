use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod grid;
pub mod imagekit;
pub mod memory;
pub mod range;
pub mod sheets;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use grid::Grid;
pub use imagekit::ImageKitStore;
pub use memory::{MemoryFileStore, MemoryTabularStore};
pub use range::{A1Range, column_index, column_letter, sheet_range};
pub use sheets::GoogleSheetsStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTabularStore;

/// One row of cell values as the tabular store returns them.
pub type Row = Vec<String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid range '{0}'")]
    InvalidRange(String),
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
    #[error("sheet id {0} not found")]
    SheetIdNotFound(i64),
    #[error("a sheet with the name \"{0}\" already exists")]
    SheetExists(String),
    #[error("file '{0}' not found")]
    FileNotFound(String),
    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

/// Spreadsheet-like system of record addressed by `Sheet!A1:Z` ranges.
///
/// Every call is an independent remote operation; nothing here spans calls.
pub trait TabularStore: Send + Sync {
    fn read_range(&self, range: &str) -> StoreResult<Vec<Row>>;
    /// Overwrites cells starting at the range's top-left corner.
    fn update_range(&self, range: &str, values: &[Row]) -> StoreResult<()>;
    /// Appends rows after the last populated row of the table in `range`.
    fn append_rows(&self, range: &str, values: &[Row]) -> StoreResult<()>;
    fn clear_range(&self, range: &str) -> StoreResult<()>;
    fn create_sheet(&self, title: &str) -> StoreResult<SheetInfo>;
    fn list_sheets(&self) -> StoreResult<Vec<SheetInfo>>;
    fn delete_sheet(&self, sheet_id: i64) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub folder: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub file_id: String,
    pub file_name: String,
    pub url: String,
}

/// Object store holding the timetable PDFs, scoped by folder path.
pub trait FileStore: Send + Sync {
    fn upload(&self, upload: FileUpload) -> StoreResult<StoredFile>;
    fn delete(&self, file_id: &str) -> StoreResult<()>;
    fn list(&self, folder: &str) -> StoreResult<Vec<StoredFile>>;
}

pub(crate) fn normalize_folder(folder: &str) -> String {
    folder.trim_matches('/').to_string()
}
