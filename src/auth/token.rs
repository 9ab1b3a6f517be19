use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{AuthError, Identity, Role};
use crate::database::models::User;
use crate::database::repository::{RevocationStore, UserRepository};
use crate::database::DatabaseError;

/// Resolves a raw bearer token to the principal it was issued for.
///
/// The concrete token scheme lives behind this trait so the pipeline does not
/// care whether tokens are signed claims or opaque references.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, raw_token: Option<&str>) -> Result<Identity, AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role,
            jti: Uuid::new_v4(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// HS256 JWTs with a revocation list keyed by token id.
pub struct JwtTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    users: Arc<dyn UserRepository>,
    revoked: Arc<dyn RevocationStore>,
}

impl JwtTokens {
    pub fn new(
        secret: &str,
        expiry_hours: u64,
        users: Arc<dyn UserRepository>,
        revoked: Arc<dyn RevocationStore>,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(expiry_hours as i64),
            users,
            revoked,
        })
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(user.id, user.role, self.ttl);
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))?;

        Ok(IssuedToken {
            token,
            token_type: "bearer",
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Signature and expiry check only; revocation is not consulted.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected JWT: {}", e);
                AuthError::InvalidToken
            })
    }

    /// Invalidates a token until its natural expiry.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode(token)?;
        self.revoked.revoke(claims.jti, claims.expires_at()).await.map_err(|e| {
            tracing::error!("Failed to revoke token {}: {}", claims.jti, e);
            AuthError::Unavailable
        })?;
        tracing::info!("Revoked token {} for user {}", claims.jti, claims.sub);
        Ok(())
    }
}

#[async_trait]
impl TokenValidator for JwtTokens {
    async fn validate(&self, raw_token: Option<&str>) -> Result<Identity, AuthError> {
        let token = match raw_token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::MissingToken),
        };

        let claims = self.decode(token)?;

        let revoked = self.revoked.is_revoked(claims.jti).await.map_err(|e| {
            tracing::error!("Failed to check revocation for token {}: {}", claims.jti, e);
            AuthError::Unavailable
        })?;
        if revoked {
            tracing::debug!("Rejected revoked token {}", claims.jti);
            return Err(AuthError::InvalidToken);
        }

        let user = self.users.find_by_id(claims.sub).await.map_err(|e| {
            tracing::error!("Failed to load user {} for token: {}", claims.sub, e);
            AuthError::Unavailable
        })?;

        match user {
            Some(user) => Ok(user.identity()),
            None => {
                tracing::warn!("Token {} refers to missing user {}", claims.jti, claims.sub);
                Err(AuthError::InvalidToken)
            }
        }
    }
}
