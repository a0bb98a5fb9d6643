use std::sync::Arc;

use chrono::NaiveDate;
use edutrack::attendance::AttendanceStatus;
use edutrack::store::{MemoryTabularStore, Row, SheetInfo, StoreResult, TabularStore};
use edutrack::{
    Accounts, AttendanceMark, CredentialChange, ExamEntry, ExamReport, ExamReports, Records,
    RecordsError, StudentRecord,
};
use parking_lot::Mutex;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn class3_store() -> Arc<MemoryTabularStore> {
    Arc::new(MemoryTabularStore::new().with_sheet(
        "Class3",
        vec![
            row(&[
                "RollNumber",
                "StudentName",
                "ParentEmail",
                "Section",
                "2024-06-01",
                "2024-06-02",
            ]),
            row(&["05", "Asha", "asha@x.in", "A", "Present", "Absent"]),
            row(&["07", "Ravi", "ravi@x.in", "A", "Absent", "Present"]),
            row(&["09", "Meera", "meera@x.in", "B", "Present"]),
        ],
    ))
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

#[test]
fn update_student_rewrites_only_the_matching_row() {
    let store = class3_store();
    let records = Records::new(store.clone());
    let before = store.sheet_rows("Class3").unwrap();

    let row_number = records
        .update_student(
            "Class3",
            &StudentRecord::new(" 07 ", "Ravi Kumar", "rk@x.in", "C"),
        )
        .unwrap();
    assert_eq!(row_number, 3);

    let after = store.sheet_rows("Class3").unwrap();
    assert_eq!(after.len(), before.len());
    for (idx, (old, new)) in before.iter().zip(&after).enumerate() {
        if idx == 2 {
            assert_eq!(
                new,
                &row(&["07", "Ravi Kumar", "rk@x.in", "C", "Absent", "Present"])
            );
        } else {
            assert_eq!(old, new, "row {idx} changed");
        }
    }
}

#[test]
fn update_unknown_roll_number_is_not_found() {
    let store = class3_store();
    let records = Records::new(store.clone());
    let before = store.sheet_rows("Class3").unwrap();

    let err = records
        .update_student("Class3", &StudentRecord::new("99", "Ghost", "", "A"))
        .unwrap_err();
    assert!(matches!(err, RecordsError::StudentNotFound(ref roll) if roll == "99"));
    assert_eq!(store.sheet_rows("Class3").unwrap(), before);
}

#[test]
fn search_matches_trimmed_roll_number() {
    let records = Records::new(class3_store());
    let student = records.find_student("Class3", " 09").unwrap();
    assert_eq!(student, StudentRecord::new("09", "Meera", "meera@x.in", "B"));
}

#[test]
fn register_appends_after_last_student() {
    let store = class3_store();
    let records = Records::new(store.clone());
    records
        .register_student("Class3", &StudentRecord::new("11", "Kiran", "k@x.in", "B"))
        .unwrap();

    let rows = store.sheet_rows("Class3").unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4], row(&["11", "Kiran", "k@x.in", "B"]));
}

#[test]
fn day_attendance_without_column_is_a_client_condition() {
    let records = Records::new(class3_store());
    let err = records.day_attendance("Class3", june(3)).unwrap_err();
    assert!(matches!(err, RecordsError::NoAttendanceToday(_)));
    assert_eq!(err.to_string(), "No attendance marked for today.");
}

#[test]
fn mark_attendance_adds_a_column_and_touches_only_listed_students() {
    let store = class3_store();
    let records = Records::new(store.clone());
    let outcome = records
        .mark_attendance(
            "Class3",
            june(3),
            &[AttendanceMark {
                roll_number: "07".into(),
                status: AttendanceStatus::Present,
            }],
        )
        .unwrap();
    assert!(outcome.column_created);
    assert_eq!(outcome.column, "G");
    assert_eq!(outcome.marked, 1);

    let rows = store.sheet_rows("Class3").unwrap();
    assert_eq!(rows[0][6], "2024-06-03");
    assert_eq!(rows[1].len(), 6);
    assert_eq!(rows[2][6], "Present");
    assert_eq!(rows[3].len(), 5);

    let today = records.day_attendance("Class3", june(3)).unwrap();
    assert_eq!(today[1].status.as_deref(), Some("Present"));
    assert_eq!(today[0].status, None);
}

#[test]
fn mark_attendance_overwrites_an_existing_column() {
    let store = class3_store();
    let records = Records::new(store.clone());
    let outcome = records
        .mark_attendance(
            "Class3",
            june(2),
            &[AttendanceMark {
                roll_number: "09".into(),
                status: AttendanceStatus::Absent,
            }],
        )
        .unwrap();
    assert!(!outcome.column_created);
    assert_eq!(outcome.column, "F");

    let rows = store.sheet_rows("Class3").unwrap();
    assert_eq!(rows[1][5], "Absent");
    assert_eq!(rows[2][5], "Present");
    assert_eq!(rows[3], row(&["09", "Meera", "meera@x.in", "B", "Present", "Absent"]));
}

#[test]
fn mark_attendance_rejects_unknown_students_before_writing() {
    let store = class3_store();
    let records = Records::new(store.clone());
    let before = store.sheet_rows("Class3").unwrap();
    let err = records
        .mark_attendance(
            "Class3",
            june(3),
            &[
                AttendanceMark {
                    roll_number: "05".into(),
                    status: AttendanceStatus::Present,
                },
                AttendanceMark {
                    roll_number: "42".into(),
                    status: AttendanceStatus::Absent,
                },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, RecordsError::StudentNotFound(_)));
    assert_eq!(store.sheet_rows("Class3").unwrap(), before);
}

#[test]
fn mark_attendance_rejects_blank_roll_numbers() {
    let store = Arc::new(MemoryTabularStore::new().with_sheet(
        "Class3",
        vec![
            row(&["RollNumber", "StudentName", "ParentEmail", "Section"]),
            row(&["05", "Asha", "asha@x.in", "A"]),
            row(&["", "Ghost"]),
        ],
    ));
    let records = Records::new(store.clone());
    let before = store.sheet_rows("Class3").unwrap();

    let err = records
        .mark_attendance(
            "Class3",
            june(1),
            &[AttendanceMark {
                roll_number: "  ".into(),
                status: AttendanceStatus::Present,
            }],
        )
        .unwrap_err();
    assert!(matches!(err, RecordsError::Invalid(ref msg) if msg.contains("rollNumber")));
    assert_eq!(store.sheet_rows("Class3").unwrap(), before);
}

#[test]
fn tracker_reflects_the_sheet() {
    let records = Records::new(class3_store());
    let tracker = records.tracker("Class3").unwrap();
    assert_eq!(tracker.summary.total_students, 3);
    assert_eq!(tracker.summary.total_present, 3);
    assert_eq!(tracker.summary.total_absent, 2);
}

#[test]
fn delete_sheet_resolves_title_by_scan() {
    let store = Arc::new(
        MemoryTabularStore::new()
            .with_sheet("Class1", vec![row(&["RollNumber"])])
            .with_sheet("Class9", vec![row(&["RollNumber"])]),
    );
    let records = Records::new(store.clone());
    records.delete_class_sheet("Class9").unwrap();

    let titles: Vec<String> = store
        .list_sheets()
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Class1"]);

    let err = records.delete_class_sheet("Class9").unwrap_err();
    assert!(matches!(err, RecordsError::SheetNotFound(_)));
}

#[test]
fn create_sheet_writes_the_fixed_header() {
    let store = Arc::new(MemoryTabularStore::new());
    let records = Records::new(store.clone());
    let info = records.create_class_sheet("Class4").unwrap();
    assert_eq!(info.title, "Class4");
    assert_eq!(
        store.sheet_rows("Class4").unwrap(),
        vec![row(&["RollNumber", "StudentName", "ParentEmail", "Section"])]
    );
    assert!(records.create_class_sheet("Class4").is_err());
}

#[test]
fn csv_export_keeps_short_rows() {
    let records = Records::new(class3_store());
    let csv = records.export_csv("Class3").unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "RollNumber,StudentName,ParentEmail,Section,2024-06-01,2024-06-02"
    );
    assert_eq!(lines[3], "09,Meera,meera@x.in,B,Present");
}

/// Serves reads of one range from a snapshot taken before any write, so a
/// second writer sees the same rows the first one saw.
struct SnapshotReads {
    inner: MemoryTabularStore,
    range: &'static str,
    snapshot: Mutex<Option<Vec<Row>>>,
}

impl SnapshotReads {
    fn freeze(inner: MemoryTabularStore, range: &'static str) -> Self {
        let snapshot = inner.read_range(range).unwrap();
        Self {
            inner,
            range,
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl TabularStore for SnapshotReads {
    fn read_range(&self, range: &str) -> StoreResult<Vec<Row>> {
        if range == self.range {
            if let Some(rows) = self.snapshot.lock().clone() {
                return Ok(rows);
            }
        }
        self.inner.read_range(range)
    }

    fn update_range(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        self.inner.update_range(range, values)
    }

    fn append_rows(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        self.inner.append_rows(range, values)
    }

    fn clear_range(&self, range: &str) -> StoreResult<()> {
        self.inner.clear_range(range)
    }

    fn create_sheet(&self, title: &str) -> StoreResult<SheetInfo> {
        self.inner.create_sheet(title)
    }

    fn list_sheets(&self) -> StoreResult<Vec<SheetInfo>> {
        self.inner.list_sheets()
    }

    fn delete_sheet(&self, sheet_id: i64) -> StoreResult<()> {
        self.inner.delete_sheet(sheet_id)
    }
}

/// Two credential edits that both read the user block before either
/// writes: the second rewrite wins and the first change is lost.
#[test]
fn interleaved_credential_updates_lose_the_first_change() {
    let seeded = MemoryTabularStore::new().with_sheet(
        "User",
        vec![
            row(&["Username", "Password"]),
            row(&["teacher1", "pw1"]),
            row(&["teacher2", "pw2"]),
        ],
    );
    let store = Arc::new(SnapshotReads::freeze(seeded, "User!A2:B"));
    let first = Accounts::new(store.clone());
    let second = Accounts::new(store.clone());

    let change = |current: &str, password: &str, new: &str, new_password: &str| {
        CredentialChange {
            current_username: current.into(),
            new_username: new.into(),
            current_password: password.into(),
            new_password: new_password.into(),
        }
    };
    assert_eq!(first.update(&change("teacher1", "pw1", "alice", "new1")).unwrap(), 1);
    assert_eq!(second.update(&change("teacher2", "pw2", "bob", "new2")).unwrap(), 1);

    *store.snapshot.lock() = None;
    let users = Accounts::new(store).list().unwrap();
    assert_eq!(users, vec![row(&["teacher1", "pw1"]), row(&["bob", "new2"])]);
}

#[test]
fn credential_update_replaces_matching_rows() {
    let store = Arc::new(MemoryTabularStore::new().with_sheet(
        "User",
        vec![
            row(&["Username", "Password"]),
            row(&["teacher1", "pw1"]),
            row(&["teacher2", "pw2"]),
        ],
    ));
    let accounts = Accounts::new(store.clone());
    let change = CredentialChange {
        current_username: "teacher2".into(),
        new_username: "class2".into(),
        current_password: "pw2".into(),
        new_password: "secret".into(),
    };
    assert_eq!(accounts.update(&change).unwrap(), 1);
    assert_eq!(
        accounts.list().unwrap(),
        vec![row(&["teacher1", "pw1"]), row(&["class2", "secret"])]
    );
    assert_eq!(store.sheet_rows("User").unwrap()[0], row(&["Username", "Password"]));

    let stale = accounts.update(&change).unwrap_err();
    assert!(matches!(stale, RecordsError::UserNotFound));
}

#[test]
fn exam_reports_create_their_sheet_on_first_write() {
    let store = Arc::new(MemoryTabularStore::new());
    let exams = ExamReports::new(store.clone());
    assert!(exams.for_student("05").unwrap().is_empty());

    let report = ExamReport {
        roll_number: "05".into(),
        exam_data: vec![
            ExamEntry {
                subject: "Maths".into(),
                marks: "92".into(),
                grade: "A".into(),
                type_of_exam: "Midterm".into(),
            },
            ExamEntry {
                subject: " ".into(),
                marks: "".into(),
                grade: "".into(),
                type_of_exam: "".into(),
            },
        ],
    };
    assert_eq!(exams.add(&report).unwrap(), 1);
    let rows = store.sheet_rows("ExamReports").unwrap();
    assert_eq!(rows[0][0], "RollNumber");
    assert_eq!(rows[1], row(&["05", "Maths", "92", "A", "Midterm"]));

    let found = exams.for_student("05").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].subject, "Maths");
    assert!(exams.for_student("06").unwrap().is_empty());
}

#[test]
fn exam_report_numbers_deserialize_as_text() {
    let report: ExamReport = serde_json::from_value(serde_json::json!({
        "rollNumber": 5,
        "examData": [{ "subject": "Science", "marks": 88, "grade": "B", "typeofexam": "Final" }]
    }))
    .unwrap();
    assert_eq!(report.roll_number, "5");
    assert_eq!(report.exam_data[0].marks, "88");
}
