use crate::records::{RecordsError, RecordsResult};
use crate::store::{Row, TabularStore, sheet_range};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const EXAM_SHEET: &str = "ExamReports";
pub const EXAM_HEADERS: [&str; 5] = ["RollNumber", "Subject", "Marks", "Grade", "TypeOfExam"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamEntry {
    #[serde(default, deserialize_with = "text_or_number")]
    pub subject: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub marks: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub grade: String,
    #[serde(rename = "typeofexam", default, deserialize_with = "text_or_number")]
    pub type_of_exam: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamReport {
    #[serde(deserialize_with = "text_or_number")]
    pub roll_number: String,
    #[serde(default)]
    pub exam_data: Vec<ExamEntry>,
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected text or number, got {other}"
        ))),
    }
}

/// Marks captured per exam, one row per subject in the `ExamReports` sheet.
pub struct ExamReports {
    store: Arc<dyn TabularStore>,
}

impl ExamReports {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    fn ensure_sheet(&self) -> RecordsResult<()> {
        let sheets = self.store.list_sheets()?;
        if sheets.iter().any(|s| s.title == EXAM_SHEET) {
            return Ok(());
        }
        self.store.create_sheet(EXAM_SHEET)?;
        let header: Row = EXAM_HEADERS.iter().map(|h| h.to_string()).collect();
        self.store
            .update_range(&sheet_range(EXAM_SHEET, "A1:E1"), &[header])?;
        info!(sheet = EXAM_SHEET, "created exam report sheet");
        Ok(())
    }

    pub fn add(&self, report: &ExamReport) -> RecordsResult<usize> {
        let roll_number = report.roll_number.trim();
        if roll_number.is_empty() {
            return Err(RecordsError::Invalid(
                "Missing required field: rollNumber".into(),
            ));
        }
        let entries: Vec<&ExamEntry> = report
            .exam_data
            .iter()
            .filter(|e| !e.subject.trim().is_empty())
            .collect();
        if entries.is_empty() {
            return Err(RecordsError::Invalid(
                "At least one exam entry with a subject is required.".into(),
            ));
        }

        self.ensure_sheet()?;
        let rows: Vec<Row> = entries
            .iter()
            .map(|e| {
                vec![
                    roll_number.to_string(),
                    e.subject.trim().to_string(),
                    e.marks.trim().to_string(),
                    e.grade.trim().to_string(),
                    e.type_of_exam.trim().to_string(),
                ]
            })
            .collect();
        self.store
            .append_rows(&sheet_range(EXAM_SHEET, "A2:E2"), &rows)?;
        info!(roll_number, entries = rows.len(), "added exam report");
        Ok(rows.len())
    }

    pub fn for_student(&self, roll_number: &str) -> RecordsResult<Vec<ExamEntry>> {
        let sheets = self.store.list_sheets()?;
        if !sheets.iter().any(|s| s.title == EXAM_SHEET) {
            return Ok(Vec::new());
        }
        let wanted = roll_number.trim();
        let rows = self.store.read_range(&sheet_range(EXAM_SHEET, "A2:E"))?;
        Ok(rows
            .iter()
            .filter(|row| row.first().is_some_and(|r| r.trim() == wanted))
            .map(|row| {
                let get = |idx: usize| row.get(idx).cloned().unwrap_or_default();
                ExamEntry {
                    subject: get(1),
                    marks: get(2),
                    grade: get(3),
                    type_of_exam: get(4),
                }
            })
            .collect())
    }
}
