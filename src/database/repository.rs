//! Storage contracts used by handlers and the auth pipeline.
//!
//! Each trait has a Postgres implementation (`postgres::PgStore`) and an
//! in-memory one (`memory::MemoryStore`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    ContactMessage, NewContactMessage, NewSkill, NewUser, Project, Skill, SkillPatch, User, ValidProjectForm,
};
use crate::auth::Role;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Fails with `Conflict` when the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn set_pin(&self, id: Uuid, pin_hash: Option<String>) -> Result<(), DatabaseError>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Newest first
    async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;

    async fn create_project(
        &self,
        form: ValidProjectForm,
        slug: String,
        image: Option<String>,
    ) -> Result<Project, DatabaseError>;

    /// Replaces all text fields; `image` is only replaced when `Some`
    async fn update_project(
        &self,
        id: Uuid,
        form: ValidProjectForm,
        image: Option<String>,
    ) -> Result<Option<Project>, DatabaseError>;

    /// Returns the removed row so its image can be cleaned up
    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;
}

#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Ordered by category, then name
    async fn list_skills(&self) -> Result<Vec<Skill>, DatabaseError>;

    async fn create_skill(&self, skill: NewSkill) -> Result<Skill, DatabaseError>;

    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> Result<Option<Skill>, DatabaseError>;

    async fn delete_skill(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create_message(&self, message: NewContactMessage) -> Result<ContactMessage, DatabaseError>;

    /// Newest first
    async fn list_messages(&self) -> Result<Vec<ContactMessage>, DatabaseError>;
}

/// Denylist of logged-out tokens, keyed by token id
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), DatabaseError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError>;
}
