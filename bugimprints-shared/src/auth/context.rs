/// Authenticated request identity
///
/// The HTTP layer validates the bearer token and then calls
/// [`resolve_context`], which reloads the user and their current team
/// memberships from the database. The resulting [`AuthContext`] is inserted
/// into the request extensions and handed explicitly to every service call.
///
/// A token for a user who has since been disabled or soft-deleted does not
/// resolve to a context.
///
/// # Example
///
/// ```no_run
/// use bugimprints_shared::auth::context::resolve_context;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = resolve_context(&pool, token, "jwt-secret-at-least-32-characters").await?;
/// println!("User {} in {} teams", auth.user_id, auth.team_ids.len());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::audit::Stamp;
use crate::models::user::{AccountType, User};

/// Identity of the acting user for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub account_type: AccountType,

    /// Live teams the user belongs to at request time
    pub team_ids: Vec<Uuid>,
}

impl AuthContext {
    pub fn new(user_id: Uuid, account_type: AccountType, team_ids: Vec<Uuid>) -> Self {
        Self {
            user_id,
            account_type,
            team_ids,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.account_type.is_superuser()
    }

    pub fn belongs_to(&self, team_id: Uuid) -> bool {
        self.team_ids.contains(&team_id)
    }

    /// Audit stamp for an operation performed by this user, now
    pub fn stamp(&self) -> Stamp {
        Stamp::new(self.user_id)
    }
}

/// Errors raised while authenticating a request
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("{0}")]
    InvalidToken(#[from] JwtError),

    /// Token is valid but the account is gone or disabled
    #[error("Account is disabled or does not exist")]
    InactiveAccount,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Builds the context for a live, active user
///
/// # Errors
///
/// Returns `AuthError::InactiveAccount` if the user is absent, soft-deleted
/// or disabled.
pub async fn load_context(pool: &PgPool, user_id: Uuid) -> Result<AuthContext, AuthError> {
    let user = User::find_by_id(pool, user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or(AuthError::InactiveAccount)?;

    let team_ids = User::team_ids(pool, user.id).await?;

    Ok(AuthContext::new(user.id, user.account_type, team_ids))
}

/// Validates an access token and loads the acting user's context
pub async fn resolve_context(pool: &PgPool, token: &str, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_access_token(token, secret)?;
    load_context(pool, claims.sub).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("Basic xyz")), Err(AuthError::InvalidFormat)));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(AuthError::InvalidFormat)));
    }

    #[test]
    fn test_context_membership() {
        let team = Uuid::new_v4();
        let ctx = AuthContext::new(Uuid::new_v4(), AccountType::Contributor, vec![team]);

        assert!(ctx.belongs_to(team));
        assert!(!ctx.belongs_to(Uuid::new_v4()));
        assert!(!ctx.is_superuser());
        assert_eq!(ctx.stamp().actor, ctx.user_id);
    }
}
