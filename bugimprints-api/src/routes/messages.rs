/// Resolution discussion threads
///
/// - `GET|POST /v1/resolutions/:id/messages`
/// - `DELETE /v1/messages/:id`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    services::messages::{self, MessageDetail},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1, max = 500, message = "Message must be 1 to 500 characters"))]
    pub message: String,

    #[serde(default)]
    pub attachments: Vec<Uuid>,
}

/// Team members and superusers
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(resolution_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MessageDetail>>> {
    Ok(Json(messages::list(&state.db, &auth, resolution_id).await?))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(resolution_id): Path<Uuid>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageDetail>)> {
    req.validate()?;

    let message = messages::create(&state.db, &auth, resolution_id, &req.message, &req.attachments).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Author or superuser
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    messages::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
