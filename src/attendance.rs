use crate::class_sheet::{ABSENT, ClassSheet, FIRST_DATE_COLUMN, PRESENT, cell};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// India Standard Time, UTC+05:30. "Today" is always evaluated here.
pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

pub fn ist_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&ist_offset()).date_naive()
}

pub fn ist_today() -> NaiveDate {
    ist_date(Utc::now())
}

pub fn date_label(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), DATE_FORMAT).ok()
}

/// Index of the header cell equal to `date`. Exact string comparison.
pub fn find_column_for_date(headers: &[String], date: &str) -> Option<usize> {
    headers.iter().position(|h| h == date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => PRESENT,
            AttendanceStatus::Absent => ABSENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no attendance column for {date}")]
pub struct NoAttendanceForDate {
    pub date: String,
}

/// Status of every student for the column labelled `date`.
pub fn day_summary(
    sheet: &ClassSheet,
    date: &str,
) -> Result<Vec<TodayStatus>, NoAttendanceForDate> {
    let column = find_column_for_date(sheet.header(), date).ok_or_else(|| NoAttendanceForDate {
        date: date.to_string(),
    })?;
    Ok(sheet
        .rows()
        .iter()
        .map(|row| TodayStatus {
            roll_number: cell(row, 0).map(str::to_string),
            student_name: cell(row, 1).map(str::to_string),
            status: cell(row, column).map(str::to_string),
        })
        .collect())
}

/// Share of counted days a student was present.
///
/// Serializes as a two-decimal string (`"50.00"`), or as the number `0`
/// when no day was counted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttendancePercentage {
    NoDays,
    Ratio(f64),
}

impl AttendancePercentage {
    pub fn from_counts(present: usize, absent: usize) -> Self {
        let total = present + absent;
        if total == 0 {
            return AttendancePercentage::NoDays;
        }
        AttendancePercentage::Ratio(present as f64 / total as f64 * 100.0)
    }

    /// Value rounded to two decimals.
    pub fn value(&self) -> f64 {
        match self {
            AttendancePercentage::NoDays => 0.0,
            AttendancePercentage::Ratio(pct) => (pct * 100.0).round() / 100.0,
        }
    }
}

impl fmt::Display for AttendancePercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendancePercentage::NoDays => write!(f, "0"),
            AttendancePercentage::Ratio(pct) => write!(f, "{pct:.2}"),
        }
    }
}

impl Serialize for AttendancePercentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttendancePercentage::NoDays => serializer.serialize_u8(0),
            AttendancePercentage::Ratio(_) => serializer.collect_str(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub total_present: usize,
    pub total_absent: usize,
    pub attendance_percentage: AttendancePercentage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub total_students: usize,
    pub total_present: usize,
    pub total_absent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracker {
    pub tracker: Vec<AttendanceRecord>,
    pub summary: ClassSummary,
}

pub fn student_record(row: &[String]) -> AttendanceRecord {
    let statuses = row.get(FIRST_DATE_COLUMN..).unwrap_or(&[]);
    let total_present = statuses.iter().filter(|s| s.as_str() == PRESENT).count();
    let total_absent = statuses.iter().filter(|s| s.as_str() == ABSENT).count();
    AttendanceRecord {
        roll_number: cell(row, 0).map(str::to_string),
        student_name: cell(row, 1).map(str::to_string),
        section: cell(row, 3).map(str::to_string),
        total_present,
        total_absent,
        attendance_percentage: AttendancePercentage::from_counts(total_present, total_absent),
    }
}

pub fn tracker(sheet: &ClassSheet) -> Tracker {
    let tracker: Vec<AttendanceRecord> = sheet.rows().iter().map(|r| student_record(r)).collect();
    let summary = ClassSummary {
        total_students: tracker.len(),
        total_present: tracker.iter().map(|r| r.total_present).sum(),
        total_absent: tracker.iter().map(|r| r.total_absent).sum(),
    };
    Tracker { tracker, summary }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub dates: Vec<String>,
    pub statuses: Vec<String>,
}

pub fn full_matrix(sheet: &ClassSheet) -> Vec<StudentAttendance> {
    let dates = sheet.date_labels().to_vec();
    sheet
        .rows()
        .iter()
        .map(|row| StudentAttendance {
            roll_number: cell(row, 0).map(str::to_string),
            student_name: cell(row, 1).map(str::to_string),
            dates: dates.clone(),
            statuses: row.get(FIRST_DATE_COLUMN..).unwrap_or(&[]).to_vec(),
        })
        .collect()
}
