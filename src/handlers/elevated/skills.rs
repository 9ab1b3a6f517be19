use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::database::models::{NewSkill, Skill, SkillPatch};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/skills
pub async fn create(State(state): State<AppState>, Json(payload): Json<NewSkill>) -> ApiResult<Skill> {
    payload.validate()?;

    let skill = state.skills.create_skill(payload).await?;
    info!(skill_id = %skill.id, name = %skill.name, "Skill created");

    Ok(ApiResponse::created(skill).message("Skill created"))
}

/// PUT /api/skills/:id - only the fields present are changed
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<SkillPatch>,
) -> ApiResult<Skill> {
    let id = parse_id(&id, "Skill")?;
    patch.validate()?;

    let skill = state
        .skills
        .update_skill(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Skill not found"))?;
    info!(skill_id = %skill.id, "Skill updated");

    Ok(ApiResponse::success(skill).message("Skill updated"))
}

/// DELETE /api/skills/:id
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id, "Skill")?;
    if !state.skills.delete_skill(id).await? {
        return Err(ApiError::not_found("Skill not found"));
    }
    info!(skill_id = %id, "Skill deleted");

    Ok(ApiResponse::success(()).message("Skill deleted"))
}
