use axum::extract::State;

use crate::database::models::Skill;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/skills - grouped by category
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Skill>> {
    Ok(ApiResponse::success(state.skills.list_skills().await?))
}
