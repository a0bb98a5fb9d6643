use super::{StoreError, StoreResult};

/// A parsed `Sheet!A1:Z` address.
///
/// Rows and columns are zero-based. `None` on an end bound means the range
/// is open in that direction (`A2:D` has no last row, `A:Z` no last row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn parse(input: &str) -> StoreResult<Self> {
        let invalid = || StoreError::InvalidRange(input.to_string());
        let (sheet, cells) = split_sheet(input).ok_or_else(invalid)?;
        if sheet.is_empty() {
            return Err(invalid());
        }

        let Some(cells) = cells else {
            return Ok(Self::whole_sheet(sheet));
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (start_col, start_row) = parse_cell(start).ok_or_else(invalid)?;
        let start_col = start_col.unwrap_or(0);
        let start_row = start_row.unwrap_or(0);

        let (end_col, end_row) = match end {
            Some(end) => parse_cell(end).ok_or_else(invalid)?,
            // A lone cell reference addresses exactly that cell.
            None => (Some(start_col), Some(start_row)),
        };
        if end_col.is_some_and(|c| c < start_col) || end_row.is_some_and(|r| r < start_row) {
            return Err(invalid());
        }

        Ok(Self {
            sheet,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    pub fn whole_sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            start_col: 0,
            start_row: 0,
            end_col: None,
            end_row: None,
        }
    }

    pub fn contains_col(&self, col: usize) -> bool {
        col >= self.start_col && self.end_col.is_none_or(|end| col <= end)
    }

    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.start_row && self.end_row.is_none_or(|end| row <= end)
    }
}

/// Builds `Sheet!cells`, quoting the sheet title when it needs it.
pub fn sheet_range(sheet: &str, cells: &str) -> String {
    format!("{}!{}", quote_sheet_name(sheet), cells)
}

pub fn quote_sheet_name(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letter`]. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

fn split_sheet(input: &str) -> Option<(String, Option<&str>)> {
    if let Some(rest) = input.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                name.push('\'');
                chars.next();
                continue;
            }
            let tail = &rest[idx + 1..];
            return match tail.strip_prefix('!') {
                Some(cells) => Some((name, Some(cells))),
                None if tail.is_empty() => Some((name, None)),
                None => None,
            };
        }
        return None;
    }

    match input.split_once('!') {
        Some((sheet, cells)) => Some((sheet.to_string(), Some(cells))),
        None => Some((input.to_string(), None)),
    }
}

fn parse_cell(cell: &str) -> Option<(Option<usize>, Option<usize>)> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        if n == 0 {
            return None;
        }
        Some(n - 1)
    };
    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip_across_boundaries() {
        for (idx, letters) in [(0, "A"), (3, "D"), (25, "Z"), (26, "AA"), (701, "ZZ")] {
            assert_eq!(column_letter(idx), letters);
            assert_eq!(column_index(letters), Some(idx));
        }
        assert_eq!(column_index("a"), Some(0));
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn parses_open_ended_class_range() {
        let range = A1Range::parse("Class3!A1:Z").unwrap();
        assert_eq!(range.sheet, "Class3");
        assert_eq!((range.start_col, range.start_row), (0, 0));
        assert_eq!(range.end_col, Some(25));
        assert_eq!(range.end_row, None);
    }

    #[test]
    fn parses_single_cell_and_bounded_row() {
        let cell = A1Range::parse("User!A2").unwrap();
        assert_eq!((cell.start_col, cell.start_row), (0, 1));
        assert_eq!((cell.end_col, cell.end_row), (Some(0), Some(1)));

        let row = A1Range::parse("Class1!A2:D2").unwrap();
        assert_eq!((row.end_col, row.end_row), (Some(3), Some(1)));
    }

    #[test]
    fn parses_quoted_sheet_names() {
        let range = A1Range::parse("'Exam Reports'!A2:E").unwrap();
        assert_eq!(range.sheet, "Exam Reports");
        let range = A1Range::parse("'Bob''s Class'").unwrap();
        assert_eq!(range.sheet, "Bob's Class");
        assert_eq!(range, A1Range::whole_sheet("Bob's Class"));
    }

    #[test]
    fn rejects_malformed_ranges() {
        for bad in ["", "!A1", "Class1!", "Class1!A0", "Class1!D1:A1", "'Open!A1", "Class1!1A"] {
            assert!(A1Range::parse(bad).is_err(), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn sheet_range_quotes_only_when_needed() {
        assert_eq!(sheet_range("Class3", "A1:Z"), "Class3!A1:Z");
        assert_eq!(sheet_range("Class 3", "A1"), "'Class 3'!A1");
    }
}
