use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::admin_dto::{BackupResponse, ImageUploadResponse, WipePayload, WipeResponse},
    error::{Error, Result},
    AppState,
};

/// Largest accepted question image.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[utoipa::path(
    post,
    path = "/api/admin/backup",
    responses(
        (status = 201, description = "Backup written", body = Json<BackupResponse>)
    )
)]
#[axum::debug_handler]
pub async fn backup_database(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BackupResponse>)> {
    let backup = state.admin_service.backup().await?;
    Ok((StatusCode::CREATED, Json(backup)))
}

#[utoipa::path(
    post,
    path = "/api/admin/wipe",
    request_body = WipePayload,
    responses(
        (status = 200, description = "Bank and weights deleted", body = Json<WipeResponse>),
        (status = 400, description = "Not confirmed"),
        (status = 401, description = "Wrong password or wiping disabled")
    )
)]
#[axum::debug_handler]
pub async fn wipe_database(
    State(state): State<AppState>,
    Json(payload): Json<WipePayload>,
) -> Result<Json<WipeResponse>> {
    payload.validate()?;
    let result = state
        .admin_service
        .wipe(&payload.password, payload.confirm)
        .await?;
    state.test_service.clear().await;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/images",
    request_body(content = String, description = "Multipart form with an image `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored; use `image_path` on a question", body = Json<ImageUploadResponse>),
        (status = 400, description = "Missing file or unsupported image type")
    )
)]
#[axum::debug_handler]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_string();
        let data: bytes::Bytes = field.bytes().await?;
        if data.is_empty() {
            return Err(Error::BadRequest("The uploaded image is empty".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(Error::BadRequest("Images must be 10 MB or smaller".to_string()));
        }

        let image_path = state.admin_service.save_image(&filename, &data).await?;
        return Ok((StatusCode::CREATED, Json(ImageUploadResponse { image_path })));
    }

    Err(Error::BadRequest("An image file is required".to_string()))
}
