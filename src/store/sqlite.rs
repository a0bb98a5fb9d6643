use super::range::A1Range;
use super::{Grid, Row, SheetInfo, StoreError, StoreResult, TabularStore};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;

/// Tabular store kept in a local SQLite file, one row per non-empty cell.
pub struct SqliteTabularStore {
    connection: Mutex<Connection>,
}

impl SqliteTabularStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS sheets (
                sheet_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS cells (
                sheet_id INTEGER NOT NULL REFERENCES sheets(sheet_id) ON DELETE CASCADE,
                row_idx INTEGER NOT NULL,
                col_idx INTEGER NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (sheet_id, row_idx, col_idx)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn sheet_id(tx: &Connection, title: &str) -> StoreResult<i64> {
        tx.query_row(
            "SELECT sheet_id FROM sheets WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::SheetNotFound(title.to_string()))
    }

    fn load_grid(conn: &Connection, sheet_id: i64) -> StoreResult<Grid> {
        let mut stmt = conn.prepare(
            "SELECT row_idx, col_idx, value FROM cells WHERE sheet_id = ?1
             ORDER BY row_idx ASC, col_idx ASC",
        )?;
        let cells = stmt.query_map(params![sheet_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut grid = Grid::new();
        for cell in cells {
            let (row_idx, col_idx, value) = cell?;
            grid.set(row_idx as usize, col_idx as usize, value);
        }
        Ok(grid)
    }

    fn save_grid(tx: &Transaction, sheet_id: i64, grid: &Grid) -> StoreResult<()> {
        tx.execute("DELETE FROM cells WHERE sheet_id = ?1", params![sheet_id])?;
        let mut stmt = tx.prepare(
            "INSERT INTO cells (sheet_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (row_idx, row) in grid.rows().iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                stmt.execute(params![sheet_id, row_idx as i64, col_idx as i64, value])?;
            }
        }
        Ok(())
    }

    fn mutate<F>(&self, range: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Grid, &A1Range),
    {
        let range = A1Range::parse(range)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let sheet_id = Self::sheet_id(&tx, &range.sheet)?;
        let mut grid = Self::load_grid(&tx, sheet_id)?;
        apply(&mut grid, &range);
        Self::save_grid(&tx, sheet_id, &grid)?;
        tx.commit()?;
        Ok(())
    }
}

impl TabularStore for SqliteTabularStore {
    fn read_range(&self, range: &str) -> StoreResult<Vec<Row>> {
        let range = A1Range::parse(range)?;
        let conn = self.connection.lock();
        let sheet_id = Self::sheet_id(&conn, &range.sheet)?;
        Ok(Self::load_grid(&conn, sheet_id)?.read(&range))
    }

    fn update_range(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        self.mutate(range, |grid, range| grid.write(range, values))
    }

    fn append_rows(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        self.mutate(range, |grid, range| {
            grid.append(range, values);
        })
    }

    fn clear_range(&self, range: &str) -> StoreResult<()> {
        self.mutate(range, |grid, range| grid.clear(range))
    }

    fn create_sheet(&self, title: &str) -> StoreResult<SheetInfo> {
        let conn = self.connection.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT sheet_id FROM sheets WHERE title = ?1",
                params![title],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::SheetExists(title.to_string()));
        }
        conn.execute("INSERT INTO sheets (title) VALUES (?1)", params![title])?;
        Ok(SheetInfo {
            sheet_id: conn.last_insert_rowid(),
            title: title.to_string(),
        })
    }

    fn list_sheets(&self) -> StoreResult<Vec<SheetInfo>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare("SELECT sheet_id, title FROM sheets ORDER BY sheet_id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SheetInfo {
                sheet_id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        let mut sheets = Vec::new();
        for sheet in rows {
            sheets.push(sheet?);
        }
        Ok(sheets)
    }

    fn delete_sheet(&self, sheet_id: i64) -> StoreResult<()> {
        let conn = self.connection.lock();
        let removed = conn.execute("DELETE FROM sheets WHERE sheet_id = ?1", params![sheet_id])?;
        if removed == 0 {
            return Err(StoreError::SheetIdNotFound(sheet_id));
        }
        Ok(())
    }
}
