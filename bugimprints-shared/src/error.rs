/// Domain error taxonomy
///
/// Every service operation returns [`CoreError`]. Each variant carries a
/// machine-readable [`kind`](CoreError::kind) that the HTTP layer puts in the
/// `error` field of its response body. Nothing here is retried; a failed rule
/// check aborts the surrounding transaction before any write happens.
///
/// # Example
///
/// ```
/// use bugimprints_shared::error::CoreError;
///
/// let err = CoreError::InvalidState("Bug is rejected, cannot resolve it".to_string());
/// assert_eq!(err.kind(), "invalid_state");
/// ```

use uuid::Uuid;

/// Result alias for domain operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the audit, lifecycle and permission layers
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed a domain rule (empty title, missing assignees, ...)
    #[error("{0}")]
    Validation(String),

    /// A referenced entity is absent or soft-deleted
    #[error("Referenced {entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: Uuid },

    /// The entity is in a state that forbids the operation
    #[error("{0}")]
    InvalidState(String),

    /// The actor may not perform this operation
    #[error("{0}")]
    Forbidden(String),

    /// The target entity is absent or soft-deleted
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A mutating call was made without an acting identity
    #[error("An acting user is required for this operation")]
    MissingIdentity,

    /// Uniqueness violation (team name, email, ...)
    #[error("{0}")]
    Conflict(String),

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl CoreError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::MissingReference { .. } => "missing_reference",
            CoreError::InvalidState(_) => "invalid_state",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::NotFound { .. } => "not_found",
            CoreError::MissingIdentity => "missing_identity",
            CoreError::Conflict(_) => "conflict",
            CoreError::Database(_) => "internal_error",
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NotFound { entity, id }
    }

    pub fn missing(entity: &'static str, id: Uuid) -> Self {
        CoreError::MissingReference { entity, id }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return CoreError::Conflict(conflict_message(constraint));
            }
            if db_err.is_foreign_key_violation() {
                return CoreError::Validation(format!(
                    "Invalid reference: {}",
                    db_err.constraint().unwrap_or("foreign key")
                ));
            }
        }
        CoreError::Database(err)
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "Email already exists".to_string(),
        "users_username_key" => "Username already exists".to_string(),
        "teams_name_key" => "Team name already exists".to_string(),
        "bug_resolutions_bug_id_key" => "Bug already has a resolution".to_string(),
        "bug_watches_bug_watcher_key" => "Already watching this bug".to_string(),
        "bug_duplicates_pair_key" => "Bug is already marked as a duplicate".to_string(),
        other => format!("Constraint violation: {}", other),
    }
}
