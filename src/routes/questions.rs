use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::{
        category_dto::CategoryListResponse,
        question_dto::{QuestionListQuery, QuestionPayload},
    },
    error::Result,
    models::question::Question,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/questions",
    request_body = QuestionPayload,
    responses(
        (status = 201, description = "Question added to the bank", body = Json<Question>),
        (status = 400, description = "Missing fields or answer not among the choices")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let new = payload.to_new_question()?;
    let question = state.question_service.create(&new).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/questions",
    params(
        ("search" = Option<String>, Query, description = "Text matched against question, answer, category and choices"),
        ("category" = Option<String>, Query, description = "Only this category")
    ),
    responses(
        (status = 200, description = "Questions, newest first", body = Json<Vec<Question>>)
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionListQuery>,
) -> Result<impl IntoResponse> {
    let questions = state.question_service.list(&query).await?;
    Ok(Json(questions))
}

#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question found", body = Json<Question>),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Question>> {
    let question = state.question_service.get(id).await?;
    Ok(Json(question))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = QuestionPayload,
    responses(
        (status = 200, description = "Question replaced", body = Json<Question>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<Question>> {
    payload.validate()?;
    let new = payload.to_new_question()?;
    let question = state.question_service.update(id, &new).await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.question_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Distinct categories with question counts", body = Json<CategoryListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = state.question_service.category_counts().await?;
    Ok(Json(CategoryListResponse { categories }))
}
