//! Password hashing.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult};

/// One-way password hashing and verification.
pub trait PasswordEncoder: Send + Sync {
    /// Hash a plaintext password.
    fn encode(&self, password: &str) -> AppResult<String>;

    /// Check a plaintext password against a stored hash.
    fn matches(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Argon2id encoder producing PHC-format hash strings.
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordEncoder {
    params: Params,
}

impl Argon2PasswordEncoder {
    /// Encoder with custom cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to hash password");
                AppError::Internal("Failed to process password".to_string())
            })
    }

    fn matches(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse password hash");
            AppError::Internal("Failed to verify password".to_string())
        })?;

        // Cost parameters are read back from the hash itself
        Ok(self
            .hasher()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Cheap parameters so tests do not spend seconds per hash.
#[cfg(test)]
pub(crate) fn test_encoder() -> Argon2PasswordEncoder {
    Argon2PasswordEncoder::with_params(Params::new(1024, 1, 1, None).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let encoder = test_encoder();
        let hash = encoder.encode("correct horse battery staple").unwrap();

        assert_ne!(hash, "correct horse battery staple");
        assert!(hash.starts_with("$argon2id$"));
        assert!(encoder.matches("correct horse battery staple", &hash).unwrap());
        assert!(!encoder.matches("correct horse battery stapler", &hash).unwrap());
        assert!(!encoder.matches("", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let encoder = test_encoder();
        let first = encoder.encode("password123").unwrap();
        let second = encoder.encode("password123").unwrap();

        assert_ne!(first, second);
        assert!(encoder.matches("password123", &first).unwrap());
        assert!(encoder.matches("password123", &second).unwrap());
    }

    #[test]
    fn test_default_encoder_verifies_cheap_hash() {
        let hash = test_encoder().encode("password123").unwrap();
        assert!(Argon2PasswordEncoder::default()
            .matches("password123", &hash)
            .unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let result = test_encoder().matches("password123", "not-a-phc-string");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
