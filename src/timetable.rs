use crate::store::{FileStore, FileUpload, StoreError, StoredFile};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_CLASSES: [&str; 12] = [
    "LKG", "UKG", "Class1", "Class2", "Class3", "Class4", "Class5", "Class6", "Class7", "Class8",
    "Class9", "Class10",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimetableCategory {
    General,
    Exam,
}

impl TimetableCategory {
    pub const ALL: [TimetableCategory; 2] = [TimetableCategory::General, TimetableCategory::Exam];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimetableCategory::General => "general",
            TimetableCategory::Exam => "exam",
        }
    }

    pub fn folder_root(&self) -> &'static str {
        match self {
            TimetableCategory::General => "Class_Timetables",
            TimetableCategory::Exam => "Exam_Timetables",
        }
    }

    pub fn folder(&self, class: &str) -> String {
        format!("{}/{}", self.folder_root(), class)
    }
}

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("No class selected.")]
    MissingClass,
    #[error("No file uploaded.")]
    MissingFile,
    #[error("No file to delete.")]
    NothingToDelete,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TimetableResult<T> = Result<T, TimetableError>;

/// Last known file id per `(category, class)`.
///
/// Advisory only: the file store is the source of truth. Starts empty and
/// is rebuilt with [`SlotMap::rehydrate`].
#[derive(Debug, Default)]
pub struct SlotMap {
    slots: Mutex<HashMap<(TimetableCategory, String), String>>,
}

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: TimetableCategory, class: &str) -> Option<String> {
        self.slots
            .lock()
            .get(&(category, class.to_string()))
            .cloned()
    }

    pub fn set(&self, category: TimetableCategory, class: &str, file_id: impl Into<String>) {
        self.slots
            .lock()
            .insert((category, class.to_string()), file_id.into());
    }

    pub fn clear(&self, category: TimetableCategory, class: &str) -> Option<String> {
        self.slots.lock().remove(&(category, class.to_string()))
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds slots from folder listings. When a folder holds several
    /// files the last one listed wins. Returns the number of slots set.
    pub fn rehydrate<S, I>(&self, store: &S, classes: I) -> Result<usize, StoreError>
    where
        S: FileStore + ?Sized,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut restored = 0;
        for class in classes {
            let class = class.as_ref();
            for category in TimetableCategory::ALL {
                let files = store.list(&category.folder(class))?;
                if files.len() > 1 {
                    warn!(
                        category = category.as_str(),
                        class,
                        count = files.len(),
                        "folder holds more than one timetable"
                    );
                }
                if let Some(file) = files.last() {
                    self.set(category, class, file.file_id.clone());
                    restored += 1;
                }
            }
        }
        Ok(restored)
    }
}

#[derive(Debug, Clone)]
pub struct TimetableFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Keeps at most one current timetable file per class and category.
pub struct Timetables {
    store: Arc<dyn FileStore>,
    slots: Arc<SlotMap>,
    classes: Vec<String>,
}

impl Timetables {
    pub fn new(store: Arc<dyn FileStore>, slots: Arc<SlotMap>, classes: Vec<String>) -> Self {
        Self {
            store,
            slots,
            classes,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    /// Replaces the class's current file.
    ///
    /// The previous file is deleted first and the upload only runs once that
    /// delete succeeded. A failure between the two leaves the class with no
    /// file; it never leaves two.
    pub fn upload(
        &self,
        category: TimetableCategory,
        class: &str,
        file: Option<TimetableFile>,
    ) -> TimetableResult<StoredFile> {
        let class = class.trim();
        if class.is_empty() {
            return Err(TimetableError::MissingClass);
        }
        let file = file.ok_or(TimetableError::MissingFile)?;

        if let Some(previous) = self.slots.get(category, class) {
            if let Err(err) = self.store.delete(&previous) {
                error!(
                    category = category.as_str(),
                    class,
                    file_id = %previous,
                    error = %err,
                    "failed to delete previous timetable"
                );
                return Err(err.into());
            }
            self.slots.clear(category, class);
            info!(
                category = category.as_str(),
                class,
                file_id = %previous,
                "deleted previous timetable"
            );
        }

        let stored = self
            .store
            .upload(FileUpload {
                file_name: file.file_name,
                folder: category.folder(class),
                bytes: file.bytes,
            })
            .map_err(|err| {
                error!(
                    category = category.as_str(),
                    class,
                    error = %err,
                    "failed to upload timetable"
                );
                TimetableError::from(err)
            })?;
        self.slots.set(category, class, stored.file_id.clone());
        info!(category = category.as_str(), class, file_id = %stored.file_id, "uploaded timetable");
        Ok(stored)
    }

    pub fn delete(&self, category: TimetableCategory, class: &str) -> TimetableResult<()> {
        let class = class.trim();
        let file_id = self
            .slots
            .get(category, class)
            .ok_or(TimetableError::NothingToDelete)?;
        self.store.delete(&file_id).map_err(|err| {
            error!(
                category = category.as_str(),
                class,
                file_id = %file_id,
                error = %err,
                "failed to delete timetable"
            );
            TimetableError::from(err)
        })?;
        self.slots.clear(category, class);
        info!(category = category.as_str(), class, file_id = %file_id, "deleted timetable");
        Ok(())
    }

    pub fn list(
        &self,
        category: TimetableCategory,
        class: &str,
    ) -> TimetableResult<Vec<StoredFile>> {
        Ok(self.store.list(&category.folder(class.trim()))?)
    }
}
