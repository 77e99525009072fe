use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::test_dto::{CurrentTestResponse, GenerateTestPayload, GeneratedTestResponse},
    error::{Error, Result},
    models::generated_test::GeneratedTest,
    services::{pdf_service::PdfService, test_service::render_preview},
    utils::time,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/tests/generate",
    request_body = GenerateTestPayload,
    responses(
        (status = 201, description = "Test assembled; `warning` set when the bank ran short", body = Json<GeneratedTestResponse>),
        (status = 400, description = "Blank name or question count out of range"),
        (status = 422, description = "No category has a positive weight")
    )
)]
#[axum::debug_handler]
pub async fn generate_test(
    State(state): State<AppState>,
    Json(payload): Json<GenerateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (test, quotas) = state
        .test_service
        .generate(&payload.name, payload.question_count)
        .await?;
    let warning = test.shortfall_warning();
    Ok((
        StatusCode::CREATED,
        Json(GeneratedTestResponse {
            test,
            quotas,
            warning,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/tests/current",
    responses(
        (status = 200, description = "Most recently generated test", body = Json<CurrentTestResponse>),
        (status = 404, description = "Nothing generated yet")
    )
)]
#[axum::debug_handler]
pub async fn current_test(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let test = state.test_service.current().await?;
    Ok(Json(CurrentTestResponse::from(test)))
}

#[utoipa::path(
    get,
    path = "/api/tests/current/preview",
    responses(
        (status = 200, description = "Plain-text preview", content_type = "text/plain"),
        (status = 404, description = "Nothing generated yet")
    )
)]
#[axum::debug_handler]
pub async fn preview_test(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let test = state.test_service.current().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_preview(&test),
    ))
}

#[utoipa::path(
    get,
    path = "/api/tests/current/test.pdf",
    responses(
        (status = 200, description = "Student copy", content_type = "application/pdf"),
        (status = 404, description = "Nothing generated yet")
    )
)]
#[axum::debug_handler]
pub async fn download_test_pdf(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let test = state.test_service.current().await?;
    let filename = download_name("Test", &test);
    let bytes = render_blocking(state.pdf_service.clone(), test, false).await?;
    Ok(pdf_response(filename, bytes))
}

#[utoipa::path(
    get,
    path = "/api/tests/current/answer-key.pdf",
    responses(
        (status = 200, description = "Answer key with correct bubbles filled", content_type = "application/pdf"),
        (status = 404, description = "Nothing generated yet")
    )
)]
#[axum::debug_handler]
pub async fn download_answer_key_pdf(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let test = state.test_service.current().await?;
    let filename = download_name("AnswerKey", &test);
    let bytes = render_blocking(state.pdf_service.clone(), test, true).await?;
    Ok(pdf_response(filename, bytes))
}

async fn render_blocking(pdf: PdfService, test: GeneratedTest, answer_key: bool) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        if answer_key {
            pdf.render_answer_key(&test)
        } else {
            pdf.render_test(&test)
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("PDF task failed: {}", e)))?
}

/// `Test_<name>_ID<id>_<stamp>.pdf`, with the name reduced to file-safe characters.
pub fn download_name(kind: &str, test: &GeneratedTest) -> String {
    let safe_name: String = test
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!(
        "{}_{}_ID{}_{}.pdf",
        kind,
        safe_name,
        test.id,
        time::file_stamp(&test.generated_at)
    )
}

fn pdf_response(filename: String, bytes: Vec<u8>) -> impl IntoResponse {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
}
