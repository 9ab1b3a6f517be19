//! Ordered guard evaluated before protected handlers.
//!
//! Token validation always runs first; the role check and the PIN gate only
//! ever see a principal the token validator has already resolved. The first
//! failing stage is reported and later stages are skipped.

use std::sync::Arc;

use super::pin::PinGate;
use super::role;
use super::token::TokenValidator;
use super::{AuthError, Identity, Role};

/// Per-route policy, fixed when the route is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Guard {
    pub role: Option<Role>,
    pub pin: bool,
}

impl Guard {
    pub const AUTHENTICATED: Guard = Guard { role: None, pin: false };
    pub const ADMIN: Guard = Guard { role: Some(Role::Admin), pin: false };
    pub const ADMIN_WITH_PIN: Guard = Guard { role: Some(Role::Admin), pin: true };

    pub const fn with_pin(self) -> Self {
        Guard { pin: true, ..self }
    }
}

/// Secrets presented by the caller for one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub bearer: Option<&'a str>,
    pub pin: Option<&'a str>,
}

pub struct AuthPipeline {
    tokens: Arc<dyn TokenValidator>,
    pins: PinGate,
}

impl AuthPipeline {
    pub fn new(tokens: Arc<dyn TokenValidator>, pins: PinGate) -> Self {
        Self { tokens, pins }
    }

    pub fn pins(&self) -> &PinGate {
        &self.pins
    }

    pub async fn evaluate(&self, credentials: &Credentials<'_>, guard: Guard) -> Result<Identity, AuthError> {
        let identity = self.tokens.validate(credentials.bearer).await?;

        if let Some(required) = guard.role {
            role::authorize(&identity, required)?;
        }

        if guard.pin {
            self.pins.check_pin(&identity, credentials.pin).await?;
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::Hasher;
    use crate::auth::pin::MAX_PIN_ATTEMPTS;
    use crate::auth::rate_limit::{MemoryAttemptStore, RateLimiter};
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Accepts a single token string and resolves it to a fixed identity.
    struct StaticTokens {
        token: &'static str,
        identity: Identity,
    }

    #[async_trait]
    impl TokenValidator for StaticTokens {
        async fn validate(&self, raw_token: Option<&str>) -> Result<Identity, AuthError> {
            match raw_token {
                None | Some("") => Err(AuthError::MissingToken),
                Some(t) if t == self.token => Ok(self.identity.clone()),
                Some(_) => Err(AuthError::InvalidToken),
            }
        }
    }

    fn build(role: Role, pin: Option<&str>) -> (AuthPipeline, Identity) {
        let hasher = Hasher::new(1024, 1).unwrap();
        let identity = Identity {
            id: Uuid::new_v4(),
            role,
            pin_hash: pin.map(|p| hasher.hash(p).unwrap()),
        };
        let tokens = Arc::new(StaticTokens { token: "good", identity: identity.clone() });
        let pins = PinGate::new(RateLimiter::new(Arc::new(MemoryAttemptStore::new())));
        (AuthPipeline::new(tokens, pins), identity)
    }

    fn creds<'a>(bearer: Option<&'a str>, pin: Option<&'a str>) -> Credentials<'a> {
        Credentials { bearer, pin }
    }

    #[tokio::test]
    async fn missing_token_short_circuits_every_guard() {
        let (pipeline, _) = build(Role::Admin, Some("1234"));
        for guard in [Guard::AUTHENTICATED, Guard::ADMIN, Guard::ADMIN_WITH_PIN] {
            assert_eq!(pipeline.evaluate(&creds(None, Some("1234")), guard).await, Err(AuthError::MissingToken));
        }
    }

    #[tokio::test]
    async fn authenticated_guard_ignores_role() {
        let (pipeline, identity) = build(Role::User, None);
        let resolved = pipeline.evaluate(&creds(Some("good"), None), Guard::AUTHENTICATED).await.unwrap();
        assert_eq!(resolved, identity);
    }

    #[tokio::test]
    async fn admin_guard_enforces_role() {
        let (pipeline, _) = build(Role::User, None);
        assert_eq!(pipeline.evaluate(&creds(Some("good"), None), Guard::ADMIN).await, Err(AuthError::Forbidden));

        let (pipeline, _) = build(Role::Admin, None);
        assert!(pipeline.evaluate(&creds(Some("good"), None), Guard::ADMIN).await.is_ok());
    }

    #[tokio::test]
    async fn role_failure_skips_pin_stage() {
        let (pipeline, identity) = build(Role::User, Some("1234"));

        let result = pipeline.evaluate(&creds(Some("good"), Some("0000")), Guard::ADMIN_WITH_PIN).await;
        assert_eq!(result, Err(AuthError::Forbidden));
        assert_eq!(pipeline.pins().failed_attempts(identity.id).await, Ok(0));
    }

    #[tokio::test]
    async fn invalid_token_never_touches_counter() {
        let (pipeline, identity) = build(Role::Admin, Some("1234"));

        for _ in 0..10 {
            let result = pipeline.evaluate(&creds(Some("forged"), Some("0000")), Guard::ADMIN_WITH_PIN).await;
            assert_eq!(result, Err(AuthError::InvalidToken));
        }
        assert_eq!(pipeline.pins().failed_attempts(identity.id).await, Ok(0));
    }

    #[tokio::test]
    async fn pin_guard_runs_after_token() {
        let (pipeline, _) = build(Role::User, Some("1234"));
        let pin_only = Guard::AUTHENTICATED.with_pin();

        assert_eq!(pipeline.evaluate(&creds(Some("good"), None), pin_only).await, Err(AuthError::PinRequired));
        assert!(pipeline.evaluate(&creds(Some("good"), Some("1234")), pin_only).await.is_ok());
    }

    #[tokio::test]
    async fn lockout_scenario() {
        let (pipeline, identity) = build(Role::Admin, Some("1234"));
        let wrong = creds(Some("good"), Some("0000"));

        for _ in 0..MAX_PIN_ATTEMPTS {
            assert_eq!(pipeline.evaluate(&wrong, Guard::ADMIN_WITH_PIN).await, Err(AuthError::InvalidPin));
        }
        assert_eq!(pipeline.pins().failed_attempts(identity.id).await, Ok(5));

        let right = creds(Some("good"), Some("1234"));
        assert_eq!(pipeline.evaluate(&right, Guard::ADMIN_WITH_PIN).await, Err(AuthError::RateLimited));
    }
}
