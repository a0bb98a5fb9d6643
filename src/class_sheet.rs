use crate::store::{Row, sheet_range};

pub const ROLL_NUMBER: &str = "RollNumber";
pub const STUDENT_NAME: &str = "StudentName";
pub const PARENT_EMAIL: &str = "ParentEmail";
pub const SECTION: &str = "Section";

pub const FIXED_HEADERS: [&str; 4] = [ROLL_NUMBER, STUDENT_NAME, PARENT_EMAIL, SECTION];
pub const FIXED_COLUMNS: usize = FIXED_HEADERS.len();
/// First header column holding a `YYYY-MM-DD` label.
pub const FIRST_DATE_COLUMN: usize = FIXED_COLUMNS;
/// Right edge of every whole-sheet read.
pub const LAST_COLUMN: &str = "ZZ";

pub const PRESENT: &str = "Present";
pub const ABSENT: &str = "Absent";

/// Snapshot of one class's roster and attendance grid.
///
/// Row 0 of the source range is the header; the rest are students in sheet
/// order. Rows are kept exactly as read, so they may be shorter than the
/// header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSheet {
    header: Row,
    rows: Vec<Row>,
}

impl ClassSheet {
    /// Splits a `Sheet!A1:..` read into header and data rows.
    pub fn from_values(values: Vec<Row>) -> Self {
        let mut values = values.into_iter();
        let header = values.next().unwrap_or_default();
        Self {
            header,
            rows: values.collect(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn date_labels(&self) -> &[String] {
        self.header.get(FIRST_DATE_COLUMN..).unwrap_or(&[])
    }

    /// Sheet row number (1-based, header = 1) of data row `index`.
    pub fn sheet_row_number(index: usize) -> usize {
        index + 2
    }

    /// Whole-sheet range used for every snapshot read.
    pub fn full_range(class: &str) -> String {
        sheet_range(class, &format!("A1:{LAST_COLUMN}"))
    }

    /// Data rows only, header excluded.
    pub fn data_range(class: &str) -> String {
        sheet_range(class, &format!("A2:{LAST_COLUMN}"))
    }

    /// Roster columns of the first data row, the anchor for appends.
    pub fn roster_append_range(class: &str) -> String {
        sheet_range(class, "A2:D2")
    }
}

pub fn cell(row: &[String], index: usize) -> Option<&str> {
    row.get(index).map(String::as_str)
}
