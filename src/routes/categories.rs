use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::category_dto::{
        CategorySettingsResponse, SaveCategorySettingsPayload, SaveCategorySettingsResponse,
    },
    error::Result,
    models::category_weight::CategoryWeight,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/category-settings",
    responses(
        (status = 200, description = "Weights, stock and previewed target counts", body = Json<CategorySettingsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<CategorySettingsResponse>> {
    let counts = state.question_service.category_counts().await?;
    let overview = state
        .category_service
        .overview(&counts, state.test_service.default_size())
        .await?;
    Ok(Json(overview))
}

#[utoipa::path(
    put,
    path = "/api/category-settings",
    request_body = SaveCategorySettingsPayload,
    responses(
        (status = 200, description = "Weights replaced; `warning` set when they do not total 100", body = Json<SaveCategorySettingsResponse>),
        (status = 400, description = "Out-of-range percentage or duplicate category")
    )
)]
#[axum::debug_handler]
pub async fn save_settings(
    State(state): State<AppState>,
    Json(payload): Json<SaveCategorySettingsPayload>,
) -> Result<Json<SaveCategorySettingsResponse>> {
    payload.validate()?;
    for entry in &payload.weights {
        entry.validate()?;
    }
    let weights: Vec<CategoryWeight> = payload.weights.iter().map(CategoryWeight::from).collect();
    let saved = state.category_service.save(weights).await?;
    Ok(Json(saved))
}

#[utoipa::path(
    delete,
    path = "/api/category-settings",
    responses((status = 200, description = "All weights removed"))
)]
#[axum::debug_handler]
pub async fn reset_settings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let removed = state.category_service.reset().await?;
    Ok(Json(json!({ "removed": removed })))
}
