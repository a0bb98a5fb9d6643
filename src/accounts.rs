use crate::records::{RecordsError, RecordsResult};
use crate::store::{Row, TabularStore, sheet_range};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const USER_SHEET: &str = "User";

/// Requested replacement of one class teacher's login pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialChange {
    pub current_username: String,
    pub new_username: String,
    pub current_password: String,
    pub new_password: String,
}

/// Username/password rows kept in the `User` sheet, starting at `A2`.
pub struct Accounts {
    store: Arc<dyn TabularStore>,
}

impl Accounts {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    fn block_range() -> String {
        sheet_range(USER_SHEET, "A2:B")
    }

    pub fn list(&self) -> RecordsResult<Vec<Row>> {
        Ok(self.store.read_range(&Self::block_range())?)
    }

    /// Replaces every row matching both current values, then rewrites the
    /// whole block. Returns how many rows changed.
    pub fn update(&self, change: &CredentialChange) -> RecordsResult<usize> {
        let rows = self.list()?;
        let mut replaced = 0;
        let updated: Vec<Row> = rows
            .into_iter()
            .map(|row| {
                let username = row.first().map(String::as_str);
                let password = row.get(1).map(String::as_str);
                let matches = username == Some(change.current_username.as_str())
                    && password == Some(change.current_password.as_str());
                if matches {
                    replaced += 1;
                    vec![change.new_username.clone(), change.new_password.clone()]
                } else {
                    row
                }
            })
            .collect();
        if replaced == 0 {
            return Err(RecordsError::UserNotFound);
        }

        self.store.clear_range(&Self::block_range())?;
        self.store
            .update_range(&sheet_range(USER_SHEET, "A2"), &updated)?;
        info!(replaced, "updated class teacher credentials");
        Ok(replaced)
    }
}
