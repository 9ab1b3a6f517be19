use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{slugify, FieldErrors};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub description: Option<String>,
    pub stack: Option<String>,
    /// Path inside the blob store, e.g. `projects/<uuid>.png`
    pub image: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project as returned by the API, with the public image link resolved
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub image_url: Option<String>,
}

impl ProjectView {
    pub fn new(project: Project, image_url: Option<String>) -> Self {
        Self { project, image_url }
    }
}

/// Text fields of a create or update form
#[derive(Debug, Clone, Default)]
pub struct ProjectForm {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub stack: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl ProjectForm {
    pub fn validate(&self) -> Result<ValidProjectForm, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("title", self.title.as_deref(), Some(255));
        errors.required_text("summary", self.summary.as_deref(), None);
        errors.into_result()?;

        Ok(ValidProjectForm {
            title: self.title.as_deref().unwrap_or_default().trim().to_string(),
            summary: self.summary.as_deref().unwrap_or_default().trim().to_string(),
            description: non_blank(&self.description),
            stack: non_blank(&self.stack),
            github: non_blank(&self.github),
            website: non_blank(&self.website),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidProjectForm {
    pub title: String,
    pub summary: String,
    pub description: Option<String>,
    pub stack: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl ValidProjectForm {
    /// Slug fixed at creation: slugified title plus a unix timestamp suffix
    pub fn slug(&self, now: DateTime<Utc>) -> String {
        let base = slugify(&self.title);
        if base.is_empty() {
            format!("project-{}", now.timestamp())
        } else {
            format!("{}-{}", base, now.timestamp())
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
