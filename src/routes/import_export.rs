use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

use crate::{
    dto::admin_dto::ImportResponse,
    error::{Error, Result},
    services::export_service::ExportService,
    utils::time,
    AppState,
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[utoipa::path(
    post,
    path = "/api/import/excel",
    request_body(content = String, description = "Multipart form with an xlsx/xls `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Rows imported and skipped, with a per-row log", body = Json<ImportResponse>),
        (status = 400, description = "Not a spreadsheet, or required columns missing")
    )
)]
#[axum::debug_handler]
pub async fn import_excel(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>> {
    let mut upload: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.xlsx").to_string();
        let data = field.bytes().await?;
        upload = Some((filename, data));
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::BadRequest("A spreadsheet file is required".to_string()))?;
    let lower = filename.to_ascii_lowercase();
    if !(lower.ends_with(".xlsx") || lower.ends_with(".xls")) {
        return Err(Error::BadRequest(format!(
            "'{}' is not an Excel file (.xlsx or .xls)",
            filename
        )));
    }
    if data.is_empty() {
        return Err(Error::BadRequest("The uploaded file is empty".to_string()));
    }

    tracing::info!(file = %filename, bytes = data.len(), "importing questions from excel");
    let report = state.import_service.import_workbook(data.to_vec()).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/export/questions.xlsx",
    responses(
        (status = 200, description = "Question bank in the import layout", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    )
)]
#[axum::debug_handler]
pub async fn export_questions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let questions = state.question_service.all().await?;
    let counts = state.question_service.category_counts().await?;
    let weights = state.category_service.weights().await?;

    let buffer = ExportService::generate_questions_xlsx(&questions, &counts, &weights)?;
    let filename = format!("question_bank_{}.xlsx", time::file_stamp(&time::now()));
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
