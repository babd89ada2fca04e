//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use lightbase_core::error::AppError;

/// Fixed digest used to equalize timing when the email is unknown and the
/// reduce-error-info flag is on. The plaintext behind it was discarded.
const PLACEHOLDER_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$uHhmxYNCg1vW5crOZyIgzw$W9bZuhLmLbPqvTS2WVfgETejrKMLwyoDNHqpcI99oDY";

/// Handles password hashing and verification using Argon2id.
#[derive(Debug, Clone)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a new password hasher instance.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a plaintext password using Argon2id with a random salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                AppError::server("server.internal.passwordHash")
                    .with_info(serde_json::json!({ "message": e.to_string() }))
            })?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored Argon2id hash.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if not.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            AppError::server("server.internal.passwordHash")
                .with_info(serde_json::json!({ "message": e.to_string() }))
        })?;

        let argon2 = Argon2::default();
        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::server("server.internal.passwordHash")
                .with_info(serde_json::json!({ "message": e.to_string() }))),
        }
    }

    /// Runs a compare against the fixed placeholder hash, discarding the
    /// result. Called for unknown emails so the response time matches the
    /// known-email path.
    pub fn dummy_verify(&self, password: &str) {
        let _ = self.verify(password, PLACEHOLDER_HASH);
    }

    /// The placeholder hash stored for randomly-initialized logins until the
    /// user sets a real password through the reset flow.
    pub fn placeholder_hash(&self) -> &'static str {
        PLACEHOLDER_HASH
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("P@ss1234").unwrap();
        assert!(hasher.verify("P@ss1234", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn placeholder_hash_parses() {
        let hasher = PasswordHasher::new();
        // Must be a structurally valid digest so dummy_verify exercises the
        // full compare path.
        assert!(!hasher.verify("anything", hasher.placeholder_hash()).unwrap());
    }
}
