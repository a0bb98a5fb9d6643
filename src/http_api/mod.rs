use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    Accounts, AttendanceMark, CredentialChange, ExamReport, ExamReports, Records, RecordsError,
    SlotMap, StudentRecord, TimetableCategory, TimetableError, TimetableFile, Timetables,
    attendance,
    store::{FileStore, StoreError, TabularStore},
};

/// Uploaded timetables are PDFs; allow well beyond axum's 2 MiB default.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    records: Arc<Records>,
    accounts: Arc<Accounts>,
    exams: Arc<ExamReports>,
    timetables: Arc<Timetables>,
}

impl AppState {
    pub fn new(
        tabular: Arc<dyn TabularStore>,
        files: Arc<dyn FileStore>,
        slots: Arc<SlotMap>,
        classes: Vec<String>,
    ) -> Self {
        Self {
            records: Arc::new(Records::new(tabular.clone())),
            accounts: Arc::new(Accounts::new(tabular.clone())),
            exams: Arc::new(ExamReports::new(tabular)),
            timetables: Arc::new(Timetables::new(files, slots, classes)),
        }
    }

    pub fn timetables(&self) -> Arc<Timetables> {
        self.timetables.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<RecordsError> for ApiError {
    fn from(value: RecordsError) -> Self {
        match value {
            RecordsError::Invalid(_) | RecordsError::NoAttendanceToday(_) => {
                ApiError::invalid(value.to_string())
            }
            RecordsError::StudentNotFound(_)
            | RecordsError::UserNotFound
            | RecordsError::SheetNotFound(_) => ApiError::not_found(value.to_string()),
            RecordsError::Csv(_) => ApiError::internal(value.to_string()),
            RecordsError::Store(err @ StoreError::SheetExists(_)) => {
                ApiError::invalid(err.to_string())
            }
            RecordsError::Store(err @ StoreError::SheetNotFound(_)) => {
                ApiError::not_found(err.to_string())
            }
            RecordsError::Store(err) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<TimetableError> for ApiError {
    fn from(value: TimetableError) -> Self {
        match value {
            TimetableError::MissingClass
            | TimetableError::MissingFile
            | TimetableError::NothingToDelete => ApiError::invalid(value.to_string()),
            TimetableError::Store(err) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Upstream(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error", message)
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), code, %message, "request failed");
        } else {
            warn!(status = status.as_u16(), code, %message, "request rejected");
        }
        let body = Json(ErrorBody {
            error: code,
            message,
        });
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/timetables/classes", get(list_classes))
        .route("/api/timetables/upload/:class", post(upload_general))
        .route("/api/timetables/delete/:class", delete(delete_general))
        .route("/api/timetables/view/:class", get(view_general))
        .route("/api/exam-timetables/upload/:class", post(upload_exam))
        .route("/api/exam-timetables/delete/:class", delete(delete_exam))
        .route("/api/exam-timetables/view/:class", get(view_exam))
        .route("/save", post(save_student))
        .route("/search-student", post(search_student))
        .route("/update-student", post(update_student))
        .route("/attendance/current/:class_sheet", get(current_attendance))
        .route("/attendance/tracker", post(attendance_tracker))
        .route("/attendance/mark", post(mark_attendance))
        .route(
            "/attendance/full/:class_sheet",
            get(full_attendance).delete(delete_full_attendance),
        )
        .route("/attendance/full/:class_sheet/csv", get(export_attendance_csv))
        .route("/sheet/create", post(create_sheet))
        .route("/getUsers", get(get_users))
        .route("/updateUser", post(update_user))
        .route("/addexamreport", post(add_exam_report))
        .route("/examreport/:roll_number", get(get_exam_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "edutrack HTTP API listening");
    axum::serve(listener, app).await
}

/// Store adapters block on remote calls; keep them off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("request worker failed: {err}")))?
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid(rejection.body_text()))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Rejects the body when any key is absent or blank, naming all of them.
fn require_fields(body: &Value, keys: &[&str]) -> Result<(), ApiError> {
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| is_blank(body.get(*key)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ApiError::invalid(format!(
        "Missing required fields: {}",
        missing.join(", ")
    )))
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|err| ApiError::invalid(format!("invalid request body: {err}")))
}

const STUDENT_FIELDS: [&str; 5] = [
    "Class",
    "RollNumber",
    "NameOfTheStudent",
    "ParentEmail",
    "Section",
];

#[derive(Debug, Deserialize)]
struct StudentPayload {
    #[serde(rename = "Class")]
    class: String,
    #[serde(flatten)]
    student: StudentRecord,
}

#[derive(Debug, Deserialize)]
struct StudentLookup {
    #[serde(rename = "Class")]
    class: String,
    #[serde(rename = "RollNumber")]
    roll_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerPayload {
    class_sheet: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPayload {
    class_sheet: String,
    #[serde(default)]
    date: Option<String>,
    entries: Vec<AttendanceMark>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSheetPayload {
    sheet_name: String,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_classes(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.timetables.classes().to_vec())
}

async fn read_timetable_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<TimetableFile>, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Ok(None);
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::invalid(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "timetable.pdf".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::invalid(err.body_text()))?;
        return Ok(Some(TimetableFile {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn upload_timetable(
    state: AppState,
    category: TimetableCategory,
    class: String,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let file = read_timetable_file(multipart).await?;
    let timetables = state.timetables();
    let stored = run_blocking(move || Ok(timetables.upload(category, &class, file)?)).await?;
    Ok(Json(stored).into_response())
}

async fn delete_timetable(
    state: AppState,
    category: TimetableCategory,
    class: String,
) -> Result<Response, ApiError> {
    let timetables = state.timetables();
    run_blocking(move || Ok(timetables.delete(category, &class)?)).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })).into_response())
}

async fn view_timetable(
    state: AppState,
    category: TimetableCategory,
    class: String,
) -> Result<Response, ApiError> {
    let timetables = state.timetables();
    let files = run_blocking(move || Ok(timetables.list(category, &class)?)).await?;
    Ok(Json(files).into_response())
}

async fn upload_general(
    State(state): State<AppState>,
    Path(class): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    upload_timetable(state, TimetableCategory::General, class, multipart).await
}

async fn delete_general(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Response, ApiError> {
    delete_timetable(state, TimetableCategory::General, class).await
}

async fn view_general(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Response, ApiError> {
    view_timetable(state, TimetableCategory::General, class).await
}

async fn upload_exam(
    State(state): State<AppState>,
    Path(class): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    upload_timetable(state, TimetableCategory::Exam, class, multipart).await
}

async fn delete_exam(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Response, ApiError> {
    delete_timetable(state, TimetableCategory::Exam, class).await
}

async fn view_exam(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Response, ApiError> {
    view_timetable(state, TimetableCategory::Exam, class).await
}

async fn save_student(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &STUDENT_FIELDS)?;
    let payload: StudentPayload = parse_body(body)?;
    let records = state.records.clone();
    run_blocking(move || Ok(records.register_student(&payload.class, &payload.student)?)).await?;
    Ok(Json(json!({ "message": "Data saved successfully!" })))
}

async fn search_student(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StudentRecord>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &["Class", "RollNumber"])?;
    let lookup: StudentLookup = parse_body(body)?;
    let records = state.records.clone();
    let student =
        run_blocking(move || Ok(records.find_student(&lookup.class, &lookup.roll_number)?)).await?;
    Ok(Json(student))
}

async fn update_student(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &STUDENT_FIELDS)?;
    let payload: StudentPayload = parse_body(body)?;
    let records = state.records.clone();
    run_blocking(move || Ok(records.update_student(&payload.class, &payload.student)?)).await?;
    Ok(Json(
        json!({ "message": "Student information updated successfully!" }),
    ))
}

async fn current_attendance(
    State(state): State<AppState>,
    Path(class_sheet): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.records.clone();
    let summary = run_blocking(move || Ok(records.today_attendance(&class_sheet)?)).await?;
    Ok(Json(json!({ "success": true, "todaySummary": summary })))
}

async fn attendance_tracker(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &["classSheet"])?;
    let payload: TrackerPayload = parse_body(body)?;
    let records = state.records.clone();
    let tracker = run_blocking(move || Ok(records.tracker(&payload.class_sheet)?)).await?;
    Ok(Json(json!({
        "success": true,
        "tracker": tracker.tracker,
        "summary": tracker.summary,
    })))
}

async fn mark_attendance(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &["classSheet", "entries"])?;
    let payload: MarkPayload = parse_body(body)?;
    let date = match payload.date.as_deref().map(str::trim) {
        None | Some("") => attendance::ist_today(),
        Some(raw) => attendance::parse_date_label(raw).ok_or_else(|| {
            ApiError::invalid(format!("invalid date '{raw}', expected YYYY-MM-DD"))
        })?,
    };
    let records = state.records.clone();
    let outcome = run_blocking(move || {
        Ok(records.mark_attendance(&payload.class_sheet, date, &payload.entries)?)
    })
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Attendance for {} saved.", outcome.date),
        "date": outcome.date,
        "marked": outcome.marked,
    })))
}

async fn full_attendance(
    State(state): State<AppState>,
    Path(class_sheet): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.records.clone();
    let data = run_blocking(move || Ok(records.full_attendance(&class_sheet)?)).await?;
    Ok(Json(json!({ "success": true, "attendanceData": data })))
}

async fn delete_full_attendance(
    State(state): State<AppState>,
    Path(class_sheet): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.records.clone();
    let name = class_sheet.clone();
    run_blocking(move || Ok(records.delete_class_sheet(&name)?)).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Attendance sheet for {class_sheet} deleted successfully."),
    })))
}

async fn export_attendance_csv(
    State(state): State<AppState>,
    Path(class_sheet): Path<String>,
) -> Result<Response, ApiError> {
    let records = state.records.clone();
    let csv = run_blocking(move || Ok(records.export_csv(&class_sheet)?)).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

async fn create_sheet(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &["sheetName"])?;
    let payload: CreateSheetPayload = parse_body(body)?;
    let records = state.records.clone();
    let info = run_blocking(move || Ok(records.create_class_sheet(&payload.sheet_name)?)).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Sheet \"{}\" created successfully.", info.title),
    })))
}

async fn get_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let accounts = state.accounts.clone();
    let rows = run_blocking(move || Ok(accounts.list()?)).await?;
    Ok(Json(json!(rows)))
}

async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(
        &body,
        &[
            "CurrentUsername",
            "NewUsername",
            "CurrentPassword",
            "NewPassword",
        ],
    )?;
    let change: CredentialChange = parse_body(body)?;
    let accounts = state.accounts.clone();
    run_blocking(move || Ok(accounts.update(&change)?)).await?;
    Ok(Json(json!({ "message": "User info updated successfully!" })))
}

async fn add_exam_report(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    require_fields(&body, &["rollNumber", "examData"])?;
    let report: ExamReport = parse_body(body)?;
    let exams = state.exams.clone();
    let added = run_blocking(move || Ok(exams.add(&report)?)).await?;
    Ok(Json(json!({
        "message": "Exam report added successfully!",
        "entries": added,
    })))
}

async fn get_exam_report(
    State(state): State<AppState>,
    Path(roll_number): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let exams = state.exams.clone();
    let reports = run_blocking(move || Ok(exams.for_student(&roll_number)?)).await?;
    Ok(Json(json!({ "success": true, "reports": reports })))
}
