use crate::attendance::{
    self, AttendanceStatus, NoAttendanceForDate, StudentAttendance, TodayStatus, Tracker,
};
use crate::class_sheet::{ClassSheet, FIRST_DATE_COLUMN, FIXED_HEADERS, cell};
use crate::roster::{StudentRecord, find_row_by_roll_number};
use crate::store::{Row, SheetInfo, StoreError, TabularStore, column_letter, sheet_range};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("{0}")]
    Invalid(String),
    #[error("Student not found.")]
    StudentNotFound(String),
    #[error("User not found.")]
    UserNotFound,
    #[error("Sheet \"{0}\" not found.")]
    SheetNotFound(String),
    #[error("No attendance marked for today.")]
    NoAttendanceToday(String),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<NoAttendanceForDate> for RecordsError {
    fn from(value: NoAttendanceForDate) -> Self {
        RecordsError::NoAttendanceToday(value.date)
    }
}

pub type RecordsResult<T> = Result<T, RecordsError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub roll_number: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub date: String,
    pub column: String,
    pub marked: usize,
    pub column_created: bool,
}

/// Class sheet operations: registration, row-keyed roster edits, and the
/// attendance views computed from a sheet snapshot.
pub struct Records {
    store: Arc<dyn TabularStore>,
}

impl Records {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    pub fn class_sheet(&self, class: &str) -> RecordsResult<ClassSheet> {
        let class = require_name(class, "classSheet")?;
        let values = self.store.read_range(&ClassSheet::full_range(class))?;
        Ok(ClassSheet::from_values(values))
    }

    pub fn register_student(&self, class: &str, student: &StudentRecord) -> RecordsResult<()> {
        let class = require_name(class, "Class")?;
        self.store.append_rows(
            &ClassSheet::roster_append_range(class),
            &[student.to_row()],
        )?;
        info!(class, roll_number = %student.roll_number, "registered student");
        Ok(())
    }

    pub fn find_student(&self, class: &str, roll_number: &str) -> RecordsResult<StudentRecord> {
        let class = require_name(class, "Class")?;
        let rows = self.store.read_range(&ClassSheet::data_range(class))?;
        let idx = find_row_by_roll_number(&rows, roll_number)
            .ok_or_else(|| RecordsError::StudentNotFound(roll_number.to_string()))?;
        Ok(StudentRecord::from_row(&rows[idx]))
    }

    /// Rewrites the fixed cells of the matching row in place and returns its
    /// sheet row number. No other row and no attendance cell is written.
    pub fn update_student(&self, class: &str, student: &StudentRecord) -> RecordsResult<usize> {
        let class = require_name(class, "Class")?;
        let student = student.trimmed();
        let rows = self.store.read_range(&sheet_range(class, "A2:D"))?;
        let idx = find_row_by_roll_number(&rows, &student.roll_number)
            .ok_or_else(|| RecordsError::StudentNotFound(student.roll_number.clone()))?;
        let row_number = ClassSheet::sheet_row_number(idx);
        let range = sheet_range(class, &format!("A{row_number}:D{row_number}"));
        self.store.update_range(&range, &[student.to_row()])?;
        info!(class, roll_number = %student.roll_number, row_number, "updated student");
        Ok(row_number)
    }

    pub fn day_attendance(&self, class: &str, date: NaiveDate) -> RecordsResult<Vec<TodayStatus>> {
        let sheet = self.class_sheet(class)?;
        Ok(attendance::day_summary(&sheet, &attendance::date_label(date))?)
    }

    pub fn today_attendance(&self, class: &str) -> RecordsResult<Vec<TodayStatus>> {
        self.day_attendance(class, attendance::ist_today())
    }

    pub fn tracker(&self, class: &str) -> RecordsResult<Tracker> {
        let sheet = self.class_sheet(class)?;
        Ok(attendance::tracker(&sheet))
    }

    pub fn full_attendance(&self, class: &str) -> RecordsResult<Vec<StudentAttendance>> {
        let sheet = self.class_sheet(class)?;
        Ok(attendance::full_matrix(&sheet))
    }

    /// Records statuses for `date`, adding the date column when the header
    /// does not have one yet. Only the header cell and the listed students'
    /// cells in that column change value.
    pub fn mark_attendance(
        &self,
        class: &str,
        date: NaiveDate,
        marks: &[AttendanceMark],
    ) -> RecordsResult<MarkOutcome> {
        let class = require_name(class, "classSheet")?;
        if marks.is_empty() {
            return Err(RecordsError::Invalid(
                "At least one attendance entry is required.".into(),
            ));
        }
        let sheet = self.class_sheet(class)?;
        if sheet.header().is_empty() {
            return Err(RecordsError::Invalid(format!(
                "Sheet \"{class}\" has no header row."
            )));
        }

        let mut targets = Vec::with_capacity(marks.len());
        for mark in marks {
            require_name(&mark.roll_number, "rollNumber")?;
            let idx = find_row_by_roll_number(sheet.rows(), &mark.roll_number)
                .ok_or_else(|| RecordsError::StudentNotFound(mark.roll_number.clone()))?;
            targets.push((idx, mark.status));
        }

        let label = attendance::date_label(date);
        let existing = attendance::find_column_for_date(sheet.header(), &label);
        let column = existing.unwrap_or_else(|| sheet.header().len().max(FIRST_DATE_COLUMN));
        let letter = column_letter(column);

        if existing.is_none() {
            self.store.update_range(
                &sheet_range(class, &format!("{letter}1")),
                &[vec![label.clone()]],
            )?;
            debug!(class, date = %label, column = %letter, "added attendance column");
        }

        let last = targets.iter().map(|(idx, _)| *idx).max().unwrap_or(0);
        let mut values: Vec<Row> = sheet.rows()[..=last]
            .iter()
            .map(|row| vec![cell(row, column).unwrap_or_default().to_string()])
            .collect();
        for (idx, status) in &targets {
            values[*idx] = vec![status.as_str().to_string()];
        }
        let last_row = ClassSheet::sheet_row_number(last);
        self.store.update_range(
            &sheet_range(class, &format!("{letter}2:{letter}{last_row}")),
            &values,
        )?;
        info!(class, date = %label, marked = targets.len(), "marked attendance");

        Ok(MarkOutcome {
            date: label,
            column: letter,
            marked: targets.len(),
            column_created: existing.is_none(),
        })
    }

    /// Creates a class sheet and writes its fixed header row.
    pub fn create_class_sheet(&self, name: &str) -> RecordsResult<SheetInfo> {
        let name = require_name(name, "sheetName")?;
        let info = self.store.create_sheet(name)?;
        let header: Row = FIXED_HEADERS.iter().map(|h| h.to_string()).collect();
        self.store
            .update_range(&sheet_range(name, "A1:D1"), &[header])?;
        info!(sheet = name, sheet_id = info.sheet_id, "created class sheet");
        Ok(info)
    }

    /// Resolves the title by scanning every sheet, then deletes it.
    pub fn delete_class_sheet(&self, class: &str) -> RecordsResult<()> {
        let class = require_name(class, "classSheet")?;
        let sheets = self.store.list_sheets()?;
        let sheet = sheets
            .iter()
            .find(|s| s.title == class)
            .ok_or_else(|| RecordsError::SheetNotFound(class.to_string()))?;
        self.store.delete_sheet(sheet.sheet_id)?;
        info!(sheet = class, sheet_id = sheet.sheet_id, "deleted class sheet");
        Ok(())
    }

    pub fn export_csv(&self, class: &str) -> RecordsResult<String> {
        let class = require_name(class, "classSheet")?;
        let values = self.store.read_range(&ClassSheet::full_range(class))?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in &values {
            if row.is_empty() {
                writer.write_record([""])?;
            } else {
                writer.write_record(row)?;
            }
        }
        writer.flush().map_err(csv::Error::from)?;
        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        String::from_utf8(bytes).map_err(|err| RecordsError::Invalid(err.to_string()))
    }
}

pub(crate) fn require_name<'a>(value: &'a str, field: &str) -> RecordsResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordsError::Invalid(format!(
            "Missing required field: {field}"
        )));
    }
    Ok(trimmed)
}
