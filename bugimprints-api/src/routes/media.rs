/// Media uploads
///
/// ```text
/// POST /v1/media
/// Content-Type: multipart/form-data; boundary=...
///
/// --...
/// Content-Disposition: form-data; name="file"; filename="crash.png"
/// Content-Type: image/png
/// ```
///
/// Every part carrying a filename is stored; other parts are ignored. The
/// returned ids are then passed as `attachments` on bugs and messages.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    models::media::Media,
    services::media::{self, StoredUpload},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ids: Vec<Uuid>,
    pub media: Vec<Media>,
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        media::validate_file_name(&file_name)
            .map_err(|err| ApiError::invalid_field("file", err.to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let content = field.bytes().await?;

        let stored = state
            .storage
            .store(&file_name, content_type.as_deref(), content)
            .await?;

        uploads.push(StoredUpload {
            file_name,
            content_type,
            stored,
        });
    }

    if uploads.is_empty() {
        return Err(ApiError::invalid_field("file", "At least one file is required"));
    }

    let media = media::record_uploads(&state.db, &auth, uploads).await?;
    let ids = media.iter().map(|m| m.id).collect();

    Ok((StatusCode::CREATED, Json(UploadResponse { ids, media })))
}

/// Uploader or superuser; the stored blob is kept
pub async fn delete_media(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    media::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
