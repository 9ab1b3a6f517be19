// handlers/elevated/projects.rs - project writes (multipart forms)

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{Project, ProjectForm, ProjectView, ValidProjectForm};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::handlers::public::projects::view;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::FieldErrors;

pub const MAX_IMAGE_BYTES: usize = 2048 * 1024;
const IMAGE_DIR: &str = "projects";

#[derive(Debug)]
struct ImageUpload {
    extension: &'static str,
    bytes: Bytes,
}

#[derive(Debug)]
struct ProjectUpload {
    form: ValidProjectForm,
    image: Option<ImageUpload>,
}

/// File extension for an accepted image content type. SVG is refused since
/// stored files are served from this origin and SVG can carry script.
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Format named by the file's leading bytes
fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xff, 0xd8, 0xff, ..] => Some("jpg"),
        [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some("png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("gif"),
        [b'B', b'M', ..] => Some("bmp"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

fn check_image(content_type: Option<&str>, bytes: Bytes, errors: &mut FieldErrors) -> Option<ImageUpload> {
    let declared = content_type.and_then(image_extension);
    let Some(extension) = declared.filter(|ext| sniff_extension(&bytes) == Some(*ext)) else {
        errors.add("image", "The image must be an image.");
        return None;
    };
    if bytes.len() > MAX_IMAGE_BYTES {
        errors.add("image", "The image may not be greater than 2048 kilobytes.");
        return None;
    }
    Some(ImageUpload { extension, bytes })
}

/// Reads text fields and the optional `image` file, validating both together
async fn read_upload(mut multipart: Multipart) -> Result<ProjectUpload, ApiError> {
    let mut form = ProjectForm::default();
    let mut image = None;
    let mut errors = FieldErrors::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(str::to_string);
                let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked
                if bytes.is_empty() && !has_file_name {
                    continue;
                }
                image = check_image(content_type.as_deref(), bytes, &mut errors);
            }
            "title" => form.title = Some(field.text().await?),
            "summary" => form.summary = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "stack" => form.stack = Some(field.text().await?),
            "github" => form.github = Some(field.text().await?),
            "website" => form.website = Some(field.text().await?),
            _ => {}
        }
    }

    match form.validate() {
        Ok(form) if errors.is_empty() => Ok(ProjectUpload { form, image }),
        Ok(_) => Err(errors.into()),
        Err(form_errors) => {
            errors.merge(form_errors);
            Err(errors.into())
        }
    }
}

async fn store_image(state: &AppState, image: Option<ImageUpload>) -> Result<Option<String>, ApiError> {
    match image {
        Some(image) => Ok(Some(state.blobs.put(IMAGE_DIR, image.extension, &image.bytes).await?)),
        None => Ok(None),
    }
}

async fn discard_image(state: &AppState, path: &str) {
    if let Err(e) = state.blobs.delete(path).await {
        warn!("Failed to delete stored image {}: {}", path, e);
    }
}

/// Inserts the project, retrying once with a random suffix when another
/// project already holds the slug (same title within the same second)
async fn insert_with_unique_slug(
    state: &AppState,
    form: ValidProjectForm,
    slug: String,
    image: Option<String>,
) -> Result<Project, DatabaseError> {
    match state.projects.create_project(form.clone(), slug.clone(), image.clone()).await {
        Err(DatabaseError::Conflict(_)) => {
            let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
            let retry = format!("{}-{}", slug, suffix);
            warn!(slug = %slug, retry = %retry, "Project slug taken, retrying with suffix");
            state.projects.create_project(form, retry, image).await
        }
        result => result,
    }
}

/// POST /api/projects
pub async fn create(State(state): State<AppState>, multipart: Multipart) -> ApiResult<ProjectView> {
    let upload = read_upload(multipart).await?;
    let slug = upload.form.slug(Utc::now());
    let image = store_image(&state, upload.image).await?;

    let project = match insert_with_unique_slug(&state, upload.form, slug, image.clone()).await {
        Ok(project) => project,
        Err(e) => {
            if let Some(path) = &image {
                discard_image(&state, path).await;
            }
            return Err(e.into());
        }
    };

    info!(project_id = %project.id, slug = %project.slug, "Project created");
    Ok(ApiResponse::created(view(state.blobs.as_ref(), project)).message("Project created successfully"))
}

/// POST /api/projects/:id - full update; the slug never changes
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<ProjectView> {
    let id = parse_id(&id, "Project")?;
    let existing = state
        .projects
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let upload = read_upload(multipart).await?;
    let image = store_image(&state, upload.image).await?;

    let project = match state.projects.update_project(id, upload.form, image.clone()).await {
        Ok(Some(project)) => project,
        Ok(None) => {
            if let Some(path) = &image {
                discard_image(&state, path).await;
            }
            return Err(ApiError::not_found("Project not found"));
        }
        Err(e) => {
            if let Some(path) = &image {
                discard_image(&state, path).await;
            }
            return Err(e.into());
        }
    };

    // A replaced image is no longer referenced
    if let (Some(_), Some(old)) = (&image, &existing.image) {
        discard_image(&state, old).await;
    }

    info!(project_id = %project.id, "Project updated");
    Ok(ApiResponse::success(view(state.blobs.as_ref(), project)).message("Project updated successfully"))
}

/// DELETE /api/projects/:id - removes the row and its stored image
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id, "Project")?;
    let project = state
        .projects
        .delete_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    if let Some(path) = &project.image {
        discard_image(&state, path).await;
    }

    info!(project_id = %project.id, "Project deleted");
    Ok(ApiResponse::success(()).message("Project deleted successfully"))
}
