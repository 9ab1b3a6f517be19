//! Transaction PIN gate for sensitive operations.
//!
//! Per principal the gate is either open (fewer than `MAX_PIN_ATTEMPTS`
//! failures in the live window) or blocked. While blocked no comparison is
//! made, so a correct PIN is rejected too until the window lapses.

use std::time::Duration;
use uuid::Uuid;

use super::password;
use super::rate_limit::{AttemptKey, RateLimiter};
use super::{AuthError, Identity};

pub const PIN_ACTION: &str = "pin";
pub const MAX_PIN_ATTEMPTS: u32 = 5;
pub const PIN_DECAY: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct PinGate {
    limiter: RateLimiter,
}

impl PinGate {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }

    /// Checks `supplied_pin` against the identity's stored PIN hash.
    ///
    /// Every comparison is counted up front; a match clears the counter, so
    /// only failures remain recorded.
    pub async fn check_pin(&self, identity: &Identity, supplied_pin: Option<&str>) -> Result<(), AuthError> {
        let Some(pin_hash) = identity.pin_hash.as_deref() else {
            return Err(AuthError::PinNotSet);
        };

        let supplied = match supplied_pin {
            Some(pin) if !pin.is_empty() => pin,
            _ => return Err(AuthError::PinRequired),
        };

        let key = Self::key(identity.id);

        // The slot is claimed before comparing, so parallel guesses cannot
        // all slip under the threshold
        let reserved = self.limiter.reserve(&key, MAX_PIN_ATTEMPTS, PIN_DECAY).await.map_err(|e| {
            tracing::error!("Failed to record PIN attempt for user {}: {}", identity.id, e);
            AuthError::Unavailable
        })?;
        let Some(attempts) = reserved else {
            tracing::warn!("PIN check blocked for user {}: too many failed attempts", identity.id);
            return Err(AuthError::RateLimited);
        };

        if !password::verify_async(supplied, pin_hash).await {
            tracing::warn!("Invalid PIN for user {} ({} of {} attempts)", identity.id, attempts, MAX_PIN_ATTEMPTS);
            return Err(AuthError::InvalidPin);
        }

        self.limiter.clear(&key).await.map_err(|e| {
            tracing::error!("Failed to clear PIN attempts for user {}: {}", identity.id, e);
            AuthError::Unavailable
        })?;

        Ok(())
    }

    /// Drops any recorded failures, e.g. after the PIN itself was replaced.
    pub async fn reset(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.limiter.clear(&Self::key(user_id)).await.map_err(|e| {
            tracing::error!("Failed to reset PIN attempts for user {}: {}", user_id, e);
            AuthError::Unavailable
        })
    }

    pub async fn failed_attempts(&self, user_id: Uuid) -> Result<u32, AuthError> {
        self.limiter.attempts(&Self::key(user_id)).await.map_err(|_| AuthError::Unavailable)
    }

    fn key(user_id: Uuid) -> AttemptKey {
        AttemptKey::new(user_id, PIN_ACTION)
    }
}
