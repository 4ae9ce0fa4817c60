/// Team endpoints
///
/// - `GET|POST /v1/teams`
/// - `GET|PATCH|DELETE /v1/teams/:id`
/// - `GET /v1/teams/:id/resolutions`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    models::team::{CreateTeam, Team, UpdateTeam},
    services::teams::{self, TeamDetail, TeamResolutions},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "Team name must be 1 to 100 characters"))]
    pub name: String,

    pub leader_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "Team name must be 1 to 100 characters"))]
    pub name: Option<String>,

    pub leader_id: Option<Uuid>,
}

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(teams::list(&state.db).await?))
}

/// Superuser only; the leader becomes a member
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    req.validate()?;

    let team = teams::create(
        &state.db,
        &auth,
        CreateTeam {
            name: req.name,
            leader_id: req.leader_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamDetail>> {
    Ok(Json(teams::get(&state.db, id).await?))
}

/// Team leader or superuser
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> ApiResult<Json<Team>> {
    req.validate()?;

    let team = teams::update(
        &state.db,
        &auth,
        id,
        UpdateTeam {
            name: req.name,
            leader_id: req.leader_id,
        },
    )
    .await?;

    Ok(Json(team))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    teams::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Members and superusers only
pub async fn team_resolutions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamResolutions>> {
    Ok(Json(teams::resolutions(&state.db, &auth, id).await?))
}
