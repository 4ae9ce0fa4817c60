/// Bug resolution endpoints
///
/// - `GET|POST /v1/resolutions`
/// - `GET|PATCH|DELETE /v1/resolutions/:id`
///
/// Creating a resolution accepts its bug in the same transaction.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::nullable,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    models::bug_resolution::{BugResolution, CreateResolution, UpdateResolution},
    services::resolutions::{self, ResolutionDetail},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const MAX_REQUEST_ID_LENGTH: usize = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResolutionRequest {
    pub bug_id: Uuid,

    /// Members of the bug's team; at least one
    #[validate(length(min = 1, message = "At least one assigned member is required"))]
    pub assigned_members: Vec<Uuid>,

    pub assigned_remarks: Option<String>,
    pub root_cause: Option<String>,
    pub error_function: Option<String>,
    pub error_function_owner: Option<Uuid>,
    #[validate(length(max = 100, message = "Pull request id must be at most 100 characters"))]
    pub pull_req_id: Option<String>,
    #[validate(length(max = 100, message = "Merge request id must be at most 100 characters"))]
    pub merge_req_id: Option<String>,
    pub approved_by: Option<Uuid>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Partial update; `null` clears a field
#[derive(Debug, Default, Deserialize)]
pub struct UpdateResolutionRequest {
    /// Replaces the assignee set when present
    pub assigned_members: Option<Vec<Uuid>>,

    #[serde(default, deserialize_with = "nullable")]
    pub assigned_remarks: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub root_cause: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub error_function: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub error_function_owner: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub pull_req_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub merge_req_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub approved_by: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_time: Option<Option<DateTime<Utc>>>,
}

impl UpdateResolutionRequest {
    fn check_lengths(&self) -> Result<(), ApiError> {
        for (field, value) in [
            ("pull_req_id", &self.pull_req_id),
            ("merge_req_id", &self.merge_req_id),
        ] {
            if let Some(Some(id)) = value {
                if id.chars().count() > MAX_REQUEST_ID_LENGTH {
                    return Err(ApiError::invalid_field(
                        field,
                        "Request id must be at most 100 characters",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Resolutions of the caller's teams; every resolution for superusers
pub async fn list_resolutions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<BugResolution>>> {
    Ok(Json(resolutions::list(&state.db, &auth).await?))
}

/// Resolves a bug
///
/// # Errors
///
/// - `400 Bad Request`: unknown bug, no assignees, or assignees outside the
///   bug's team
/// - `403 Forbidden`: caller does not lead the bug's team
/// - `409 Conflict`: bug rejected or already resolved
pub async fn create_resolution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateResolutionRequest>,
) -> ApiResult<(StatusCode, Json<ResolutionDetail>)> {
    req.validate()?;

    let detail = resolutions::create(
        &state.db,
        &auth,
        CreateResolution {
            bug_id: req.bug_id,
            assigned_remarks: req.assigned_remarks,
            root_cause: req.root_cause,
            error_function: req.error_function,
            error_function_owner: req.error_function_owner,
            pull_req_id: req.pull_req_id,
            merge_req_id: req.merge_req_id,
            approved_by: req.approved_by,
            end_time: req.end_time,
        },
        &req.assigned_members,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_resolution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResolutionDetail>> {
    Ok(Json(resolutions::get(&state.db, &auth, id).await?))
}

/// Assignees only
pub async fn update_resolution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateResolutionRequest>,
) -> ApiResult<Json<ResolutionDetail>> {
    req.check_lengths()?;

    let detail = resolutions::update(
        &state.db,
        &auth,
        id,
        UpdateResolution {
            assigned_remarks: req.assigned_remarks,
            root_cause: req.root_cause,
            error_function: req.error_function,
            error_function_owner: req.error_function_owner,
            pull_req_id: req.pull_req_id,
            merge_req_id: req.merge_req_id,
            approved_by: req.approved_by,
            end_time: req.end_time,
        },
        req.assigned_members.as_deref(),
    )
    .await?;

    Ok(Json(detail))
}

/// Team leader or superuser
pub async fn delete_resolution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    resolutions::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_long_pull_request_id() {
        let req: UpdateResolutionRequest =
            serde_json::from_value(serde_json::json!({ "pull_req_id": "x".repeat(101) })).unwrap();
        let err = req.check_lengths().unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_update_allows_clearing_merge_request_id() {
        let req: UpdateResolutionRequest =
            serde_json::from_value(serde_json::json!({ "merge_req_id": null })).unwrap();
        assert!(req.check_lengths().is_ok());
        assert_eq!(req.merge_req_id, Some(None));
    }
}
