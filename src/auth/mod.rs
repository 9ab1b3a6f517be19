pub mod password;
pub mod pin;
pub mod pipeline;
pub mod rate_limit;
pub mod role;
pub mod token;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use pin::PinGate;
pub use pipeline::{AuthPipeline, Credentials, Guard};
pub use rate_limit::{AttemptKey, AttemptStore, MemoryAttemptStore, RateLimiter};
pub use token::{Claims, IssuedToken, JwtTokens, TokenError, TokenValidator};

/// Account role. There is no hierarchy: a route either requires `Admin` or it doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated principal resolved from a bearer token.
///
/// Built from the credential store on every validation, so role and PIN
/// changes take effect on the next request.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub pin_hash: Option<String>,
}

impl Identity {
    pub fn has_pin(&self) -> bool {
        self.pin_hash.is_some()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("has_pin", &self.has_pin())
            .finish()
    }
}

/// Outcome of a rejected authorization step. Carries the category only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token not provided")]
    MissingToken,

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Forbidden: Admins only")]
    Forbidden,

    #[error("Transaction PIN not set. Please create a PIN first.")]
    PinNotSet,

    #[error("Transaction PIN is required.")]
    PinRequired,

    #[error("Too many failed attempts. Please try again later.")]
    RateLimited,

    #[error("Invalid transaction PIN.")]
    InvalidPin,

    /// A backing store failed; the request is rejected rather than let through.
    #[error("Authentication service temporarily unavailable")]
    Unavailable,
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingToken => 401,
            AuthError::InvalidToken => 401,
            AuthError::Forbidden => 403,
            AuthError::PinNotSet => 403,
            AuthError::PinRequired => 400,
            AuthError::RateLimited => 429,
            AuthError::InvalidPin => 401,
            AuthError::Unavailable => 503,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::PinNotSet => "PIN_NOT_SET",
            AuthError::PinRequired => "PIN_REQUIRED",
            AuthError::RateLimited => "RATE_LIMITED",
            AuthError::InvalidPin => "INVALID_PIN",
            AuthError::Unavailable => "SERVICE_UNAVAILABLE",
        }
    }
}
