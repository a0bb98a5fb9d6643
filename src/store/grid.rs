use super::Row;
use super::range::A1Range;

/// Dense cell grid shared by the local tabular backends.
///
/// Mirrors the value semantics of a hosted spreadsheet: reads drop trailing
/// empty cells and trailing empty rows, so rows can come back shorter than
/// the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Row>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut grid = Self { rows };
        grid.normalize();
        grid
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let target = &mut self.rows[row];
        if target.len() <= col {
            target.resize(col + 1, String::new());
        }
        target[col] = value.into();
    }

    pub fn read(&self, range: &A1Range) -> Vec<Row> {
        let mut out = Vec::new();
        for (row_idx, row) in self.rows.iter().enumerate().skip(range.start_row) {
            if !range.contains_row(row_idx) {
                break;
            }
            let mut cells: Row = row
                .iter()
                .enumerate()
                .skip(range.start_col)
                .take_while(|(col, _)| range.contains_col(*col))
                .map(|(_, value)| value.clone())
                .collect();
            trim_trailing_empty(&mut cells);
            out.push(cells);
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        out
    }

    /// Writes `values` with the first cell at the range's top-left corner.
    pub fn write(&mut self, range: &A1Range, values: &[Row]) {
        for (i, row) in values.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                self.set(range.start_row + i, range.start_col + j, value.clone());
            }
        }
        self.normalize();
    }

    /// Appends `values` below the last row that has content inside the
    /// range's columns. Returns the zero-based row index of the first
    /// appended row.
    pub fn append(&mut self, range: &A1Range, values: &[Row]) -> usize {
        let last_used = self
            .rows
            .iter()
            .enumerate()
            .skip(range.start_row)
            .filter(|(_, row)| {
                row.iter()
                    .enumerate()
                    .any(|(col, v)| range.contains_col(col) && !v.is_empty())
            })
            .map(|(idx, _)| idx)
            .last();
        let first = last_used.map_or(range.start_row, |idx| idx + 1);
        for (i, row) in values.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                self.set(first + i, range.start_col + j, value.clone());
            }
        }
        self.normalize();
        first
    }

    pub fn clear(&mut self, range: &A1Range) {
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            if !range.contains_row(row_idx) {
                continue;
            }
            for (col_idx, value) in row.iter_mut().enumerate() {
                if range.contains_col(col_idx) {
                    value.clear();
                }
            }
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        for row in &mut self.rows {
            trim_trailing_empty(row);
        }
        while self.rows.last().is_some_and(|r| r.is_empty()) {
            self.rows.pop();
        }
    }
}

fn trim_trailing_empty(row: &mut Row) {
    while row.last().is_some_and(|v| v.is_empty()) {
        row.pop();
    }
}
