// handlers/public/session.rs - POST /api/auth/login

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{password, IssuedToken};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Exchange email and password for a bearer token.
///
/// Unknown email and wrong password produce the same 401 so the endpoint
/// can't be used to probe for accounts. Primary login does not touch the PIN
/// attempt counter.
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult<IssuedToken> {
    let (Some(email), Some(secret)) = (payload.email.as_deref(), payload.password.as_deref()) else {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    let Some(user) = state.users.find_by_email(email).await? else {
        warn!("Login failed: no account for submitted email");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if !password::verify_async(secret, &user.password).await {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.tokens.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "Login successful");

    Ok(ApiResponse::success(token).message("Login successful"))
}
