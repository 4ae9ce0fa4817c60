/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issuing and validation
/// - [`context`]: the per-request [`AuthContext`](context::AuthContext)
/// - [`authorization`]: the permission gate consulted before every write
///
/// # Example
///
/// ```no_run
/// use bugimprints_shared::auth::password::{hash_password, verify_password};
/// use bugimprints_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct-horse-42")?;
/// assert!(verify_password("correct-horse-42", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "secret-key-that-is-long-enough-32b")?;
/// println!("{}", tokens.access_token);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod context;
pub mod jwt;
pub mod password;
