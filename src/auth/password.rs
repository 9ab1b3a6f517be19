//! Argon2id hashing for primary passwords and transaction PINs.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use crate::config::SecurityConfig;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("failed to hash secret: {0}")]
    Hash(String),
}

/// Produces Argon2id hashes with the configured cost.
#[derive(Debug, Clone)]
pub struct Hasher {
    params: Params,
}

impl Hasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, PasswordError> {
        Self::new(security.argon2_memory_kib, security.argon2_iterations)
    }

    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// `hash` on the blocking pool, for use from request handlers.
    pub async fn hash_async(&self, secret: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?
    }
}

/// Verifies a secret against a stored PHC string. Cost parameters come from the
/// hash itself, so hashes created under older settings keep verifying.
/// A malformed stored hash never verifies.
pub fn verify(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::error!("Stored credential hash is not a valid PHC string");
        return false;
    };
    Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok()
}

/// `verify` on the blocking pool so argon2's memory-hard work never stalls an
/// async worker. A panicked verification counts as a mismatch.
pub async fn verify_async(secret: &str, stored_hash: &str) -> bool {
    let secret = secret.to_string();
    let stored_hash = stored_hash.to_string();
    match tokio::task::spawn_blocking(move || verify(&secret, &stored_hash)).await {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!("Credential verification task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Hasher {
        Hasher::new(1024, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hash = cheap().hash("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify("password123", &hash));
        assert!(!verify("password124", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = cheap();
        assert_ne!(hasher.hash("1234").unwrap(), hasher.hash("1234").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify("1234", "1234"));
        assert!(!verify("", ""));
    }

    #[tokio::test]
    async fn async_variants_match_sync() {
        let hash = cheap().hash_async("2468").await.unwrap();
        assert!(verify_async("2468", &hash).await);
        assert!(!verify_async("1357", &hash).await);
        assert!(!verify_async("2468", "not-a-hash").await);
    }

    #[test]
    fn rejects_invalid_params() {
        assert!(Hasher::new(0, 0).is_err());
    }
}
