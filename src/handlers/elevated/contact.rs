use axum::extract::State;

use crate::database::models::ContactMessage;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/contact - inbox, newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ContactMessage>> {
    Ok(ApiResponse::success(state.contacts.list_messages().await?))
}
