use super::range::A1Range;
use super::{
    FileStore, FileUpload, Grid, Row, SheetInfo, StoreError, StoreResult, StoredFile,
    TabularStore, normalize_folder,
};
use parking_lot::Mutex;

#[derive(Debug)]
struct MemorySheet {
    info: SheetInfo,
    grid: Grid,
}

#[derive(Debug, Default)]
struct MemorySheets {
    sheets: Vec<MemorySheet>,
    next_id: i64,
}

impl MemorySheets {
    fn find_mut(&mut self, title: &str) -> StoreResult<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.info.title == title)
            .ok_or_else(|| StoreError::SheetNotFound(title.to_string()))
    }

    fn find(&self, title: &str) -> StoreResult<&MemorySheet> {
        self.sheets
            .iter()
            .find(|s| s.info.title == title)
            .ok_or_else(|| StoreError::SheetNotFound(title.to_string()))
    }

    fn insert(&mut self, title: &str, grid: Grid) -> StoreResult<SheetInfo> {
        if self.sheets.iter().any(|s| s.info.title == title) {
            return Err(StoreError::SheetExists(title.to_string()));
        }
        Ok(self.push(title, grid))
    }

    /// Replaces the grid of an existing sheet or adds a new one.
    fn put(&mut self, title: &str, grid: Grid) {
        match self.sheets.iter_mut().find(|s| s.info.title == title) {
            Some(sheet) => sheet.grid = grid,
            None => {
                self.push(title, grid);
            }
        }
    }

    fn push(&mut self, title: &str, grid: Grid) -> SheetInfo {
        self.next_id += 1;
        let info = SheetInfo {
            sheet_id: self.next_id,
            title: title.to_string(),
        };
        self.sheets.push(MemorySheet {
            info: info.clone(),
            grid,
        });
        info
    }
}

/// In-process tabular store for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryTabularStore {
    state: Mutex<MemorySheets>,
}

impl MemoryTabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a sheet with raw rows, header included.
    pub fn with_sheet(self, title: &str, rows: Vec<Row>) -> Self {
        self.state.lock().put(title, Grid::from_rows(rows));
        self
    }

    /// Raw contents of a sheet, or `None` when no sheet has that title.
    pub fn sheet_rows(&self, title: &str) -> Option<Vec<Row>> {
        let state = self.state.lock();
        state.find(title).ok().map(|s| s.grid.rows().to_vec())
    }
}

impl TabularStore for MemoryTabularStore {
    fn read_range(&self, range: &str) -> StoreResult<Vec<Row>> {
        let range = A1Range::parse(range)?;
        let state = self.state.lock();
        Ok(state.find(&range.sheet)?.grid.read(&range))
    }

    fn update_range(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        let range = A1Range::parse(range)?;
        let mut state = self.state.lock();
        state.find_mut(&range.sheet)?.grid.write(&range, values);
        Ok(())
    }

    fn append_rows(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        let range = A1Range::parse(range)?;
        let mut state = self.state.lock();
        state.find_mut(&range.sheet)?.grid.append(&range, values);
        Ok(())
    }

    fn clear_range(&self, range: &str) -> StoreResult<()> {
        let range = A1Range::parse(range)?;
        let mut state = self.state.lock();
        state.find_mut(&range.sheet)?.grid.clear(&range);
        Ok(())
    }

    fn create_sheet(&self, title: &str) -> StoreResult<SheetInfo> {
        self.state.lock().insert(title, Grid::new())
    }

    fn list_sheets(&self) -> StoreResult<Vec<SheetInfo>> {
        let state = self.state.lock();
        Ok(state.sheets.iter().map(|s| s.info.clone()).collect())
    }

    fn delete_sheet(&self, sheet_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock();
        let before = state.sheets.len();
        state.sheets.retain(|s| s.info.sheet_id != sheet_id);
        if state.sheets.len() == before {
            return Err(StoreError::SheetIdNotFound(sheet_id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    folder: String,
    file: StoredFile,
    size: usize,
}

#[derive(Debug, Default)]
struct MemoryFiles {
    files: Vec<MemoryFile>,
    next_id: u64,
}

/// In-process file store. URLs are synthesized from `base_url`.
#[derive(Debug)]
pub struct MemoryFileStore {
    base_url: String,
    state: Mutex<MemoryFiles>,
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new("memory://files")
    }
}

impl MemoryFileStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(MemoryFiles::default()),
        }
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.state
            .lock()
            .files
            .iter()
            .any(|f| f.file.file_id == file_id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_of(&self, file_id: &str) -> Option<usize> {
        self.state
            .lock()
            .files
            .iter()
            .find(|f| f.file.file_id == file_id)
            .map(|f| f.size)
    }
}

impl FileStore for MemoryFileStore {
    fn upload(&self, upload: FileUpload) -> StoreResult<StoredFile> {
        let folder = normalize_folder(&upload.folder);
        let mut state = self.state.lock();
        state.next_id += 1;
        let file = StoredFile {
            file_id: format!("file_{:06}", state.next_id),
            url: format!("{}/{}/{}", self.base_url, folder, upload.file_name),
            file_name: upload.file_name,
        };
        state.files.push(MemoryFile {
            folder,
            file: file.clone(),
            size: upload.bytes.len(),
        });
        Ok(file)
    }

    fn delete(&self, file_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        let before = state.files.len();
        state.files.retain(|f| f.file.file_id != file_id);
        if state.files.len() == before {
            return Err(StoreError::FileNotFound(file_id.to_string()));
        }
        Ok(())
    }

    fn list(&self, folder: &str) -> StoreResult<Vec<StoredFile>> {
        let folder = normalize_folder(folder);
        let state = self.state.lock();
        Ok(state
            .files
            .iter()
            .filter(|f| f.folder == folder)
            .map(|f| f.file.clone())
            .collect())
    }
}
