use crate::class_sheet::cell;
use crate::store::Row;
use serde::{Deserialize, Serialize};

/// The four fixed roster cells of a student row, named as the web client
/// sends and expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "RollNumber")]
    pub roll_number: String,
    #[serde(rename = "NameOfTheStudent")]
    pub name: String,
    #[serde(rename = "ParentEmail")]
    pub parent_email: String,
    #[serde(rename = "Section")]
    pub section: String,
}

impl StudentRecord {
    pub fn new(
        roll_number: impl Into<String>,
        name: impl Into<String>,
        parent_email: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            roll_number: roll_number.into(),
            name: name.into(),
            parent_email: parent_email.into(),
            section: section.into(),
        }
    }

    /// Missing trailing cells read as empty strings.
    pub fn from_row(row: &[String]) -> Self {
        let get = |idx| cell(row, idx).unwrap_or_default().to_string();
        Self {
            roll_number: get(0),
            name: get(1),
            parent_email: get(2),
            section: get(3),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.roll_number.clone(),
            self.name.clone(),
            self.parent_email.clone(),
            self.section.clone(),
        ]
    }

    pub fn trimmed(&self) -> Self {
        Self::new(
            self.roll_number.trim(),
            self.name.trim(),
            self.parent_email.trim(),
            self.section.trim(),
        )
    }
}

/// First data row whose roll number matches after trimming both sides.
/// A blank roll number matches nothing.
pub fn find_row_by_roll_number(rows: &[Row], roll_number: &str) -> Option<usize> {
    let wanted = roll_number.trim();
    if wanted.is_empty() {
        return None;
    }
    rows.iter()
        .position(|row| cell(row, 0).is_some_and(|value| value.trim() == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn roll_number_match_is_trimmed_and_first_wins() {
        let rows = vec![
            row(&["01", "Ravi"]),
            row(&[" 07 ", "Asha"]),
            row(&["07", "Duplicate"]),
        ];
        assert_eq!(find_row_by_roll_number(&rows, "07"), Some(1));
        assert_eq!(find_row_by_roll_number(&rows, " 01"), Some(0));
        assert_eq!(find_row_by_roll_number(&rows, "99"), None);
    }

    #[test]
    fn empty_rows_never_match() {
        let rows = vec![Vec::new(), row(&["", "Ghost"])];
        assert_eq!(find_row_by_roll_number(&rows, "07"), None);
    }

    #[test]
    fn blank_roll_number_never_matches_keyless_rows() {
        let rows = vec![row(&["", "Ghost"]), row(&["  ", "Shadow"])];
        assert_eq!(find_row_by_roll_number(&rows, ""), None);
        assert_eq!(find_row_by_roll_number(&rows, "   "), None);
    }
}
