/// Authentication endpoints
///
/// - `POST /v1/auth/register` - create an account and get tokens (201)
/// - `POST /v1/auth/login` - exchange email and password for tokens
/// - `POST /v1/auth/refresh` - exchange a refresh token for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use bugimprints_shared::{
    auth::{jwt, password},
    models::user::User,
    services::accounts::{self, NewAccount},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    #[serde(default)]
    pub first_name: String,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    #[serde(default)]
    pub last_name: String,

    /// Checked for strength and similarity to the other fields
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by register and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Registers a new account
///
/// ```text
/// POST /v1/auth/register
///
/// {
///   "username": "jdoe",
///   "email": "jdoe@example.com",
///   "first_name": "Jane",
///   "last_name": "Doe",
///   "password": "Tr4cking!Bugs"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or password too weak
/// - `409 Conflict`: email or username already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    password::validate_password_strength(
        &req.password,
        &[&req.username, &req.email, &req.first_name, &req.last_name],
    )?;

    let password_hash = password::hash_password(&req.password)?;

    let user = accounts::register(
        &state.db,
        NewAccount {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// Logs in with email and password
///
/// Disabled and deleted accounts get the same answer as a wrong password.
///
/// # Errors
///
/// - `400 Bad Request`: malformed email
/// - `401 Unauthorized`: invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = accounts::find_login_user(&state.db, &req.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Login failed");
        return Err(invalid());
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired, or not a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            username: "jdoe".to_string(),
            email: "not-an-email".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: "Tr4cking!Bugs".to_string(),
        };

        let err = ApiError::from(req.validate().unwrap_err());
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Invalid email format");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_register_request_defaults_names() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username": "jdoe", "email": "jdoe@example.com", "password": "Tr4cking!Bugs"}"#,
        )
        .unwrap();
        assert!(req.first_name.is_empty());
        assert!(req.validate().is_ok());
    }
}
