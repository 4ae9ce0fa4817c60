/// HTTP error mapping
///
/// Handlers return [`ApiResult`]. Every shared error type converts into
/// [`ApiError`], which renders as
///
/// ```json
/// { "error": "not_found", "message": "Bug 5b0e... not found" }
/// ```
///
/// with the status code matching the error kind.
///
/// # Example
///
/// ```
/// use bugimprints_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(ready: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !ready {
///         return Err(ApiError::Conflict("Not ready yet".to_string()));
///     }
///     Ok(Json(json!({ "ready": true })))
/// }
/// ```

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bugimprints_shared::{
    auth::{authorization::AuthzError, context::AuthError, jwt::JwtError, password::PasswordError},
    error::CoreError,
    storage::StorageError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (400)
    BadRequest(String),

    /// Field-level validation failures (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// A referenced entity does not exist (400)
    MissingReference(String),

    /// Missing or invalid credentials (401)
    Unauthorized(String),

    /// A write reached the domain layer without an acting user (401)
    MissingIdentity(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Duplicate or state conflict (409)
    Conflict(String),

    /// Entity state forbids the operation (409)
    InvalidState(String),

    /// Upload too large (413)
    PayloadTooLarge(String),

    /// Internal server error (500); details are logged, not returned
    InternalError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `not_found`, `invalid_state`
    pub error: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) | ApiError::MissingReference(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) | ApiError::MissingIdentity(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::MissingReference(_) => "missing_reference",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::MissingIdentity(_) => "missing_identity",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::BadRequest(msg)
            | ApiError::MissingReference(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::MissingIdentity(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InvalidState(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::InternalError(msg) => write!(f, "{}: {}", self.kind(), msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind().to_string();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Request validation failed".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::MissingReference(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::MissingIdentity(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InvalidState(msg)
            | ApiError::PayloadTooLarge(msg) => (msg, None),
        };

        (status, Json(ErrorResponse { error, message, details })).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) => ApiError::invalid_field("non_field_errors", message),
            CoreError::MissingReference { .. } => ApiError::MissingReference(message),
            CoreError::InvalidState(_) => ApiError::InvalidState(message),
            CoreError::Forbidden(_) => ApiError::Forbidden(message),
            CoreError::NotFound { .. } => ApiError::NotFound(message),
            CoreError::MissingIdentity => ApiError::MissingIdentity(message),
            CoreError::Conflict(_) => ApiError::Conflict(message),
            CoreError::Database(_) => ApiError::InternalError(message),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::InvalidFormat | AuthError::InactiveAccount => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::InvalidToken(jwt) => jwt.into(),
            AuthError::Database(db) => db.into(),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(format!("Token creation failed: {}", msg)),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(msg) => ApiError::invalid_field("password", msg),
            _ => ApiError::InternalError(format!("Password operation failed: {}", err)),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Empty => ApiError::invalid_field("file", "Uploaded file is empty"),
            StorageError::Io(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(err.body_text());
        }
        ApiError::BadRequest(err.body_text())
    }
}

/// Flattens `validator` output into per-field details
impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_core_error_status_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (CoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::missing("Bug", id), StatusCode::BAD_REQUEST),
            (CoreError::InvalidState("x".into()), StatusCode::CONFLICT),
            (CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (CoreError::not_found("Bug", id), StatusCode::NOT_FOUND),
            (CoreError::MissingIdentity, StatusCode::UNAUTHORIZED),
            (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (CoreError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (core, status) in cases {
            let kind = core.kind();
            let api = ApiError::from(core);
            assert_eq!(api.status(), status);
            assert_eq!(api.kind(), kind);
        }
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("Bug not found".to_string());
        assert_eq!(err.to_string(), "not_found: Bug not found");

        let err = ApiError::ValidationError(vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_weak_password_is_validation_error() {
        let err = ApiError::from(PasswordError::Weak("too common".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "password"));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let err = ApiError::from(AuthError::InvalidToken(JwtError::Expired));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "unauthorized: Token expired");
    }
}
