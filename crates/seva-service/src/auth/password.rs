use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Hashes a password using Argon2id with a random salt.
///
/// ## Errors
/// Returns an error if password hashing fails.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Failed to hash password: {e}")))?;

    Ok(password_hash.to_string())
}

/// ## Summary
/// Verifies a password against a stored Argon2 hash.
///
/// Returns `Ok(())` if the password matches the hash, or an error otherwise.
///
/// ## Errors
/// Returns an error if password verification fails or the hash format is invalid.
pub fn verify_password(password: &str, password_hash: &str) -> ServiceResult<()> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid password hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|err| {
            tracing::trace!("Password verification failed: {}", err);
            ServiceError::NotAuthenticated
        })
}

/// ## Summary
/// Runs [`hash_password`] on the blocking pool.
///
/// ## Errors
/// Returns an error if hashing fails or the task is cancelled.
pub async fn hash_password_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_join| ServiceError::InvariantViolation("password hashing task failed"))?
}

/// ## Summary
/// Runs [`verify_password`] on the blocking pool.
///
/// ## Errors
/// Returns `NotAuthenticated` on mismatch, or an error if the task is cancelled.
pub async fn verify_password_blocking(password: String, password_hash: String) -> ServiceResult<()> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|_join| ServiceError::InvariantViolation("password verification task failed"))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_hash_and_verify_password() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong_password", &hash),
            Err(ServiceError::NotAuthenticated)
        ));
    }

    #[test_log::test]
    fn test_hash_generates_different_salts() {
        let hash1 = hash_password("same_password").expect("Failed to hash password");
        let hash2 = hash_password("same_password").expect("Failed to hash password");

        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).is_ok());
        assert!(verify_password("same_password", &hash2).is_ok());
    }

    #[test_log::test]
    fn test_verify_invalid_hash_format() {
        assert!(verify_password("password", "not_a_valid_hash").is_err());
    }

    #[test_log::test(tokio::test)]
    async fn blocking_variants_agree() {
        let hash = hash_password_blocking("lotus".to_string())
            .await
            .expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$"));
        assert!(
            verify_password_blocking("lotus".to_string(), hash.clone())
                .await
                .is_ok()
        );
        assert!(
            verify_password_blocking("lily".to_string(), hash)
                .await
                .is_err()
        );
    }
}
