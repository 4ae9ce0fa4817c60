/// Account administration and team membership
///
/// - `GET /v1/users`
/// - `POST|DELETE /v1/users/:id/teams/:team_id`
/// - `PUT /v1/users/:id/account-type`
/// - `POST /v1/users/:id/disable`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::PageQuery,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bugimprints_shared::{
    auth::context::AuthContext,
    models::user::{AccountType, User},
    services::accounts::{self, MembershipChange},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AccountTypeRequest {
    /// Full name (`team_leader`) or single-letter code (`T`)
    pub account_type: String,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub result: MembershipChange,
    pub message: String,
}

impl MembershipResponse {
    fn new(user_id: Uuid, team_id: Uuid, result: MembershipChange) -> Self {
        Self {
            user_id,
            team_id,
            result,
            message: result.message().to_string(),
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(accounts::list_users(&state.db, page.into()).await?))
}

/// Adds a user to a team; repeating the call is not an error
pub async fn add_to_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, team_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MembershipResponse>> {
    let result = accounts::add_team_member(&state.db, &auth, user_id, team_id).await?;
    Ok(Json(MembershipResponse::new(user_id, team_id, result)))
}

pub async fn remove_from_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, team_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MembershipResponse>> {
    let result = accounts::remove_team_member(&state.db, &auth, user_id, team_id).await?;
    Ok(Json(MembershipResponse::new(user_id, team_id, result)))
}

/// Superuser only
pub async fn change_account_type(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AccountTypeRequest>,
) -> ApiResult<Json<User>> {
    let account_type = AccountType::parse(&req.account_type).ok_or_else(|| {
        ApiError::invalid_field(
            "account_type",
            format!("Unknown account type: {}", req.account_type),
        )
    })?;

    let user = accounts::change_account_type(&state.db, &auth, user_id, account_type).await?;
    Ok(Json(user))
}

/// Superuser only; the account can no longer log in or use its tokens
pub async fn disable_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    accounts::disable_account(&state.db, &auth, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
