use axum::extract::{Path, State};

use crate::database::models::{Project, ProjectView};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::storage::BlobStore;

/// Attach the public image link to a stored project
pub fn view(blobs: &dyn BlobStore, project: Project) -> ProjectView {
    let image_url = project.image.as_deref().map(|path| blobs.url(path));
    ProjectView::new(project, image_url)
}

/// GET /api/projects - newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ProjectView>> {
    let projects = state.projects.list_projects().await?;
    let views = projects.into_iter().map(|p| view(state.blobs.as_ref(), p)).collect();
    Ok(ApiResponse::success(views))
}

/// GET /api/projects/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ProjectView> {
    let id = parse_id(&id, "Project")?;
    let project = state
        .projects
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(ApiResponse::success(view(state.blobs.as_ref(), project)))
}
