use axum::{extract::State, Json};

use crate::database::models::{ContactMessage, NewContactMessage};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/contact - visitor message from the site's contact form
pub async fn create(State(state): State<AppState>, Json(payload): Json<NewContactMessage>) -> ApiResult<ContactMessage> {
    payload.validate()?;

    let message = state.contacts.create_message(payload).await?;
    tracing::info!(message_id = %message.id, "Contact message received");

    Ok(ApiResponse::created(message).message("Message sent successfully"))
}
