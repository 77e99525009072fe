use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    error::Result,
    services::update_service::{InstallOutcome, UpdateStatus},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/updates/status",
    responses(
        (status = 200, description = "Result of the last background or manual check, if any")
    )
)]
#[axum::debug_handler]
pub async fn update_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = state.update_service.status().await;
    Ok(Json(json!({
        "enabled": state.update_service.is_enabled(),
        "current_version": state.update_service.config().current_version,
        "last_check": status,
    })))
}

#[utoipa::path(
    get,
    path = "/api/updates/check",
    responses(
        (status = 200, description = "Feed queried", body = Json<UpdateStatus>),
        (status = 400, description = "No release feed configured"),
        (status = 502, description = "Release feed unreachable")
    )
)]
#[axum::debug_handler]
pub async fn check_for_updates(State(state): State<AppState>) -> Result<Json<UpdateStatus>> {
    let status = state.update_service.check().await?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/api/updates/install",
    responses(
        (status = 200, description = "New executable in place; restart to use it", body = Json<InstallOutcome>),
        (status = 400, description = "Already up to date or no feed configured"),
        (status = 404, description = "No installable asset in the release")
    )
)]
#[axum::debug_handler]
pub async fn install_update(State(state): State<AppState>) -> Result<Json<InstallOutcome>> {
    let outcome = state.update_service.install().await?;
    Ok(Json(outcome))
}
