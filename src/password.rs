//! Argon2id password hashing
//!
//! Hashing is CPU-bound, so both operations run on tokio's blocking pool.
//! Each hasher also holds a decoy hash of a random secret, used to spend the
//! same verification cost when there is no stored hash to check against.

use crate::config::AuthConfig;
use crate::error::AuthError;

use std::sync::Arc;
use uuid::Uuid;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Salted Argon2id hasher with fixed cost parameters
#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
    decoy_hash: Arc<str>,
}

impl SecretHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid argon2 parameters: {e}")))?;

        let mut hasher = Self {
            params,
            decoy_hash: Arc::from(""),
        };
        hasher.decoy_hash = hasher.hash_blocking(&Uuid::new_v4().to_string())?.into();

        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {:?}", e);
                AuthError::Internal
            })?
    }

    /// Check a plaintext password against a stored PHC string
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("Password verification task failed: {:?}", e);
                AuthError::Internal
            })?
    }

    /// Run a full verification against the decoy hash. Never matches.
    pub async fn verify_decoy(&self, password: &str) -> Result<bool, AuthError> {
        let decoy_hash = self.decoy_hash.clone();
        self.verify(password, &decoy_hash).await
    }

    fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)?;

        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> SecretHasher {
        SecretHasher::new(&AuthConfig::for_tests()).unwrap()
    }

    #[tokio::test]
    async fn test_hash_is_salted_phc_string() {
        let hasher = hasher();

        let first = hasher.hash("password123").await.unwrap();
        let second = hasher.hash("password123").await.unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, "password123");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify() {
        let hasher = hasher();
        let hash = hasher.hash("password123").await.unwrap();

        assert!(hasher.verify("password123", &hash).await.unwrap());
        assert!(!hasher.verify("password124", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_garbage_hash_is_an_error() {
        let result = hasher().verify("password123", "plaintext").await;

        assert_eq!(result, Err(AuthError::Internal));
    }

    #[tokio::test]
    async fn test_decoy_never_matches() {
        let hasher = hasher();

        for password in ["", "password123", "decoy"] {
            assert!(!hasher.verify_decoy(password).await.unwrap());
        }
    }
}
