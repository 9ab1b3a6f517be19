// handlers/protected/account.rs - the caller's own account

use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{password, AuthError, Identity};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{bearer_token, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::FieldErrors;

pub const PIN_MIN_DIGITS: usize = 4;
pub const PIN_MAX_DIGITS: usize = 6;

#[derive(Debug, Serialize)]
pub struct Me {
    #[serde(flatten)]
    pub user: User,
    pub has_pin: bool,
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> ApiResult<Me> {
    // The guard resolved this id moments ago; a miss means the row was just removed
    let user = state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    let has_pin = user.has_pin();
    Ok(ApiResponse::success(Me { user, has_pin }))
}

/// POST /api/auth/logout - revokes the presented token until it would expire
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
    state.tokens.revoke(token).await?;

    Ok(ApiResponse::success(()).message("Logged out successfully"))
}

#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    pub password: Option<String>,
    pub pin: Option<String>,
}

/// PUT /api/auth/pin - create or replace the transaction PIN
///
/// Requires the primary password. Clears any PIN failures recorded against
/// the old PIN.
pub async fn set_pin(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<SetPinRequest>,
) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    errors.required_text("password", payload.password.as_deref(), None);
    errors.required_text("pin", payload.pin.as_deref(), None);
    errors.digits("pin", payload.pin.as_deref(), PIN_MIN_DIGITS, PIN_MAX_DIGITS);
    errors.into_result()?;

    let (Some(secret), Some(pin)) = (payload.password.as_deref(), payload.pin.as_deref()) else {
        return Err(ApiError::bad_request("password and pin are required"));
    };

    let user = state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if !password::verify_async(secret, &user.password).await {
        warn!(user_id = %user.id, "PIN change rejected: wrong password");
        return Err(ApiError::invalid_field("password", "The password is incorrect."));
    }

    let pin_hash = state.hasher.hash_async(pin).await?;
    state.users.set_pin(user.id, Some(pin_hash)).await?;
    state.pipeline.pins().reset(user.id).await?;

    info!(user_id = %user.id, "Transaction PIN updated");
    Ok(ApiResponse::success(()).message("Transaction PIN updated"))
}
