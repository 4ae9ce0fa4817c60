/// Password hashing with Argon2id
///
/// Hashes are PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$...`) so the
/// parameters travel with the hash and verification needs no configuration.
///
/// # Example
///
/// ```
/// use bugimprints_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Tr4cking!Bugs")?;
/// assert!(verify_password("Tr4cking!Bugs", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Argon2 memory cost in KiB (64 MB)
const M_COST: u32 = 65536;
const T_COST: u32 = 3;
const P_COST: u32 = 4;

/// Shortest accepted password
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Password does not meet the strength rules
    #[error("{0}")]
    Weak(String),
}

/// Hashes a password with Argon2id and a random 16-byte salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters or hashing fail.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(M_COST)
        .t_cost(T_COST)
        .p_cost(P_COST)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unparsable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks a new password against the strength rules
///
/// Rules: at least [`MIN_PASSWORD_LENGTH`] characters, one letter and one digit,
/// not entirely numeric, and not containing any of `user_attributes`
/// (username, email local part, names) when those are 3+ characters long.
///
/// # Example
///
/// ```
/// use bugimprints_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Tr4cking!Bugs", &["alice"]).is_ok());
/// assert!(validate_password_strength("12345678", &[]).is_err());
/// assert!(validate_password_strength("alice2024x", &["alice"]).is_err());
/// ```
pub fn validate_password_strength(password: &str, user_attributes: &[&str]) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::Weak(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(PasswordError::Weak("Password cannot be entirely numeric".to_string()));
    }

    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::Weak(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }

    let lowered = password.to_lowercase();
    let too_similar = user_attributes
        .iter()
        .map(|attr| attr.trim().to_lowercase())
        .filter(|attr| attr.chars().count() >= 3)
        .any(|attr| lowered.contains(&attr));

    if too_similar {
        return Err(PasswordError::Weak(
            "Password is too similar to your personal information".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_uses_fresh_salt() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("password", "invalid_hash"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_strength_accepts_reasonable_passwords() {
        for password in ["Tr4cking!Bugs", "s3cure-passphrase", "C0mpl3x#Pwd"] {
            assert!(
                validate_password_strength(password, &["alice", "alice@example.com"]).is_ok(),
                "Password '{}' should be valid",
                password
            );
        }
    }

    #[test]
    fn test_strength_rejects_short() {
        let err = validate_password_strength("a1b2", &[]).unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));
    }

    #[test]
    fn test_strength_rejects_numeric() {
        let err = validate_password_strength("1234567890", &[]).unwrap_err();
        assert!(err.to_string().contains("entirely numeric"));
    }

    #[test]
    fn test_strength_requires_letter_and_digit() {
        assert!(validate_password_strength("onlyletters", &[]).is_err());
        assert!(validate_password_strength("!!!!----1", &[]).is_err());
    }

    #[test]
    fn test_strength_rejects_user_attributes() {
        let err = validate_password_strength("Bob-Smith-99", &["bob", "Smith"]).unwrap_err();
        assert!(err.to_string().contains("too similar"));

        // Attributes shorter than three characters are ignored
        assert!(validate_password_strength("jo-and-7-more", &["jo"]).is_ok());
    }
}
