pub mod accounts;
pub mod attendance;
pub mod class_sheet;
pub mod config;
pub mod exam_reports;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod records;
pub mod roster;
pub mod store;
pub mod timetable;

pub use accounts::{Accounts, CredentialChange};
pub use attendance::{
    AttendancePercentage, AttendanceRecord, AttendanceStatus, ClassSummary, Tracker,
};
pub use class_sheet::ClassSheet;
pub use config::{AppConfig, ConfigError};
pub use exam_reports::{ExamEntry, ExamReport, ExamReports};
pub use records::{AttendanceMark, MarkOutcome, Records, RecordsError};
pub use roster::StudentRecord;
pub use timetable::{SlotMap, TimetableCategory, TimetableError, TimetableFile, Timetables};
