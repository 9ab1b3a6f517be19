//! Postgres-backed stores. Tables are created by `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    ContactMessage, NewContactMessage, NewSkill, NewUser, Project, Skill, SkillPatch, User, ValidProjectForm,
};
use super::repository::{ContactRepository, ProjectRepository, RevocationStore, SkillRepository, UserRepository};
use crate::auth::{AttemptKey, AttemptStore, Role};

const USER_COLUMNS: &str = "id, name, email, password, role, transaction_pin, created_at, updated_at";
const PROJECT_COLUMNS: &str =
    "id, title, slug, summary, description, stack, image, github, website, created_at, updated_at";
const SKILL_COLUMNS: &str = "id, name, category, level, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conflict_on_unique(error: sqlx::Error, what: impl FnOnce() -> String) -> DatabaseError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Conflict(what()),
        _ => DatabaseError::Sqlx(error),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let email = user.email.trim().to_lowercase();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("email '{}' already registered", email)))
    }

    async fn set_pin(&self, id: Uuid, pin_hash: Option<String>) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET transaction_pin = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(pin_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, id DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(&format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn create_project(
        &self,
        form: ValidProjectForm,
        slug: String,
        image: Option<String>,
    ) -> Result<Project, DatabaseError> {
        sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (title, slug, summary, description, stack, image, github, website)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(&form.title)
        .bind(&slug)
        .bind(&form.summary)
        .bind(&form.description)
        .bind(&form.stack)
        .bind(&image)
        .bind(&form.github)
        .bind(&form.website)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("slug '{}' already exists", slug)))
    }

    async fn update_project(
        &self,
        id: Uuid,
        form: ValidProjectForm,
        image: Option<String>,
    ) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects
             SET title = $2, summary = $3, description = $4, stack = $5,
                 image = COALESCE($6, image), github = $7, website = $8, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .bind(&form.title)
        .bind(&form.summary)
        .bind(&form.description)
        .bind(&form.stack)
        .bind(&image)
        .bind(&form.github)
        .bind(&form.website)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "DELETE FROM projects WHERE id = $1 RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }
}

#[async_trait]
impl SkillRepository for PgStore {
    async fn list_skills(&self) -> Result<Vec<Skill>, DatabaseError> {
        let skills = sqlx::query_as::<_, Skill>(&format!(
            "SELECT {} FROM skills ORDER BY category ASC NULLS LAST, name ASC",
            SKILL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(skills)
    }

    async fn create_skill(&self, skill: NewSkill) -> Result<Skill, DatabaseError> {
        let skill = sqlx::query_as::<_, Skill>(&format!(
            "INSERT INTO skills (name, category, level) VALUES ($1, $2, $3) RETURNING {}",
            SKILL_COLUMNS
        ))
        .bind(skill.name.as_deref().map(str::trim))
        .bind(&skill.category)
        .bind(skill.level)
        .fetch_one(&self.pool)
        .await?;
        Ok(skill)
    }

    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> Result<Option<Skill>, DatabaseError> {
        let skill = sqlx::query_as::<_, Skill>(&format!(
            "UPDATE skills
             SET name = COALESCE($2, name), category = COALESCE($3, category),
                 level = COALESCE($4, level), updated_at = now()
             WHERE id = $1
             RETURNING {}",
            SKILL_COLUMNS
        ))
        .bind(id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(&patch.category)
        .bind(patch.level)
        .fetch_optional(&self.pool)
        .await?;
        Ok(skill)
    }

    async fn delete_skill(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContactRepository for PgStore {
    async fn create_message(&self, message: NewContactMessage) -> Result<ContactMessage, DatabaseError> {
        let message = sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (name, email, message) VALUES ($1, $2, $3)
             RETURNING id, name, email, message, created_at",
        )
        .bind(message.name.as_deref().map(str::trim))
        .bind(message.email.as_deref().map(str::trim))
        .bind(&message.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, DatabaseError> {
        let messages = sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, message, created_at FROM contact_messages ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}

#[async_trait]
impl RevocationStore for PgStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= now()").execute(&self.pool).await?;
        sqlx::query("INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING")
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

/// Attempt counters shared by every API instance pointed at the same database.
#[derive(Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn hits_from_row(hits: i32) -> Result<u32, DatabaseError> {
    u32::try_from(hits).map_err(|_| DatabaseError::CorruptRow(format!("negative attempt count {}", hits)))
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn attempts(&self, key: &AttemptKey) -> Result<u32, DatabaseError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT hits FROM attempt_counters WHERE user_id = $1 AND action = $2 AND expires_at > now()",
        )
        .bind(key.user_id)
        .bind(&key.action)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((hits,)) => hits_from_row(hits),
            None => Ok(0),
        }
    }

    async fn hit(&self, key: &AttemptKey, decay: Duration) -> Result<u32, DatabaseError> {
        // Single statement so concurrent hits serialize on the row lock
        let (hits,): (i32,) = sqlx::query_as(
            "INSERT INTO attempt_counters (user_id, action, hits, expires_at)
             VALUES ($1, $2, 1, now() + make_interval(secs => $3))
             ON CONFLICT (user_id, action) DO UPDATE SET
                 hits = CASE WHEN attempt_counters.expires_at > now()
                             THEN attempt_counters.hits + 1 ELSE 1 END,
                 expires_at = CASE WHEN attempt_counters.expires_at > now()
                                   THEN attempt_counters.expires_at ELSE EXCLUDED.expires_at END
             RETURNING hits",
        )
        .bind(key.user_id)
        .bind(&key.action)
        .bind(decay.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;

        hits_from_row(hits)
    }

    async fn reserve(
        &self,
        key: &AttemptKey,
        max_attempts: u32,
        decay: Duration,
    ) -> Result<Option<u32>, DatabaseError> {
        // The conflict branch skips the update (and returns no row) once the
        // live count has reached the limit
        let row: Option<(i32,)> = sqlx::query_as(
            "INSERT INTO attempt_counters (user_id, action, hits, expires_at)
             VALUES ($1, $2, 1, now() + make_interval(secs => $3))
             ON CONFLICT (user_id, action) DO UPDATE SET
                 hits = CASE WHEN attempt_counters.expires_at > now()
                             THEN attempt_counters.hits + 1 ELSE 1 END,
                 expires_at = CASE WHEN attempt_counters.expires_at > now()
                                   THEN attempt_counters.expires_at ELSE EXCLUDED.expires_at END
             WHERE attempt_counters.expires_at <= now() OR attempt_counters.hits < $4
             RETURNING hits",
        )
        .bind(key.user_id)
        .bind(&key.action)
        .bind(decay.as_secs_f64())
        .bind(i64::from(max_attempts))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(hits,)| hits_from_row(hits)).transpose()
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM attempt_counters WHERE user_id = $1 AND action = $2")
            .bind(key.user_id)
            .bind(&key.action)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
