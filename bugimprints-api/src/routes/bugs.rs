/// Bug endpoints
///
/// - `GET|POST /v1/bugs`
/// - `GET|PATCH|DELETE /v1/bugs/:id`
/// - `POST /v1/bugs/:id/reject`
/// - `GET|POST|DELETE /v1/bugs/:id/watch`
/// - `GET|POST /v1/bugs/:id/duplicates`
/// - `DELETE /v1/duplicates/:id`
///
/// Reporters never set acceptance: a new bug is always under review and only
/// the reject and resolve flows move it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::nullable,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    models::{
        bug::{Bug, UpdateBug},
        bug_duplicate::BugDuplicate,
        bug_watch::BugWatch,
    },
    services::{
        bugs::{self, BugDetail, NewBug},
        Page,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBugRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,

    pub description: Option<String>,
    pub reproduction_steps: Option<String>,

    /// Defaults to the caller
    pub found_by: Option<Uuid>,

    pub team_id: Uuid,

    /// Ids returned by `POST /v1/media`
    #[serde(default)]
    pub attachments: Vec<Uuid>,

    /// Present only so it can be refused
    #[serde(default, deserialize_with = "nullable")]
    pub acceptance: Option<Option<serde_json::Value>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBugRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub reproduction_steps: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BugListQuery {
    pub team_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnwatchQuery {
    /// Someone else's watch; superusers only
    pub watcher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DuplicateRequest {
    pub child_id: Uuid,
}

pub async fn list_bugs(
    State(state): State<AppState>,
    Query(query): Query<BugListQuery>,
) -> ApiResult<Json<Vec<Bug>>> {
    let page = Page::new(query.limit, query.offset);
    Ok(Json(bugs::list(&state.db, query.team_id, page).await?))
}

/// Reports a bug
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields, `acceptance` supplied, or an unknown
///   team, reporter or attachment
pub async fn create_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBugRequest>,
) -> ApiResult<(StatusCode, Json<BugDetail>)> {
    if req.acceptance.is_some() {
        return Err(ApiError::invalid_field(
            "acceptance",
            "Acceptance cannot be set when reporting a bug",
        ));
    }
    req.validate()?;

    let bug = bugs::create(
        &state.db,
        &auth,
        NewBug {
            title: req.title,
            description: req.description,
            reproduction_steps: req.reproduction_steps,
            found_by: req.found_by,
            team_id: req.team_id,
            attachments: req.attachments,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(bug)))
}

pub async fn get_bug(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BugDetail>> {
    Ok(Json(bugs::get(&state.db, id).await?))
}

/// Reporter or superuser
pub async fn update_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBugRequest>,
) -> ApiResult<Json<Bug>> {
    req.validate()?;

    let bug = bugs::update(
        &state.db,
        &auth,
        id,
        UpdateBug {
            title: req.title,
            description: req.description,
            reproduction_steps: req.reproduction_steps,
        },
    )
    .await?;

    Ok(Json(bug))
}

/// Reporter or superuser
pub async fn delete_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    bugs::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Team leader or superuser; only bugs under review
pub async fn reject_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Bug>> {
    Ok(Json(bugs::reject(&state.db, &auth, id).await?))
}

pub async fn list_watchers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<BugWatch>>> {
    Ok(Json(bugs::watchers(&state.db, id).await?))
}

pub async fn watch_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<BugWatch>)> {
    let watch = bugs::watch(&state.db, &auth, id).await?;
    Ok((StatusCode::CREATED, Json(watch)))
}

pub async fn unwatch_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<UnwatchQuery>,
) -> ApiResult<StatusCode> {
    bugs::unwatch(&state.db, &auth, id, query.watcher_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_duplicates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<BugDuplicate>>> {
    Ok(Json(bugs::duplicates(&state.db, id).await?))
}

/// Marks `child_id` as a duplicate of the bug in the path
pub async fn mark_duplicate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<DuplicateRequest>,
) -> ApiResult<(StatusCode, Json<BugDuplicate>)> {
    let duplicate = bugs::mark_duplicate(&state.db, &auth, id, req.child_id).await?;
    Ok((StatusCode::CREATED, Json(duplicate)))
}

pub async fn remove_duplicate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    bugs::remove_duplicate(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
