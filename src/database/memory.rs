//! In-memory stores for development without Postgres and for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    ContactMessage, NewContactMessage, NewSkill, NewUser, Project, Skill, SkillPatch, User, ValidProjectForm,
};
use super::repository::{ContactRepository, ProjectRepository, RevocationStore, SkillRepository, UserRepository};
use crate::auth::Role;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    // Insertion order doubles as creation order
    projects: Vec<Project>,
    skills: Vec<Skill>,
    messages: Vec<ContactMessage>,
    revoked: HashMap<Uuid, DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = email.trim();
        Ok(self.read().users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.write();
        if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::Conflict(format!("email '{}' already registered", user.email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email.trim().to_lowercase(),
            password: user.password_hash,
            role: user.role,
            transaction_pin: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_pin(&self, id: Uuid, pin_hash: Option<String>) -> Result<(), DatabaseError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.transaction_pin = pin_hash;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), DatabaseError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        Ok(self.read().projects.iter().rev().cloned().collect())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Ok(self.read().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create_project(
        &self,
        form: ValidProjectForm,
        slug: String,
        image: Option<String>,
    ) -> Result<Project, DatabaseError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: form.title,
            slug,
            summary: form.summary,
            description: form.description,
            stack: form.stack,
            image,
            github: form.github,
            website: form.website,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.write();
        if tables.projects.iter().any(|p| p.slug == project.slug) {
            return Err(DatabaseError::Conflict(format!("slug '{}' already taken", project.slug)));
        }
        tables.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        form: ValidProjectForm,
        image: Option<String>,
    ) -> Result<Option<Project>, DatabaseError> {
        let mut tables = self.write();
        let Some(project) = tables.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        project.title = form.title;
        project.summary = form.summary;
        project.description = form.description;
        project.stack = form.stack;
        project.github = form.github;
        project.website = form.website;
        if image.is_some() {
            project.image = image;
        }
        project.updated_at = Utc::now();

        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let mut tables = self.write();
        let position = tables.projects.iter().position(|p| p.id == id);
        Ok(position.map(|i| tables.projects.remove(i)))
    }
}

#[async_trait]
impl SkillRepository for MemoryStore {
    async fn list_skills(&self) -> Result<Vec<Skill>, DatabaseError> {
        let mut skills = self.read().skills.clone();
        // Postgres sorts NULL categories last in ascending order; mirror that
        skills.sort_by(|a, b| match (&a.category, &b.category) {
            (Some(x), Some(y)) => x.cmp(y).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(skills)
    }

    async fn create_skill(&self, skill: NewSkill) -> Result<Skill, DatabaseError> {
        let now = Utc::now();
        let skill = Skill {
            id: Uuid::new_v4(),
            name: skill.name.unwrap_or_default().trim().to_string(),
            category: skill.category,
            level: skill.level,
            created_at: now,
            updated_at: now,
        };
        self.write().skills.push(skill.clone());
        Ok(skill)
    }

    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> Result<Option<Skill>, DatabaseError> {
        let mut tables = self.write();
        let Some(skill) = tables.skills.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        patch.apply(skill);
        skill.updated_at = Utc::now();
        Ok(Some(skill.clone()))
    }

    async fn delete_skill(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.write();
        let before = tables.skills.len();
        tables.skills.retain(|s| s.id != id);
        Ok(tables.skills.len() != before)
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create_message(&self, message: NewContactMessage) -> Result<ContactMessage, DatabaseError> {
        let message = ContactMessage {
            id: Uuid::new_v4(),
            name: message.name.unwrap_or_default().trim().to_string(),
            email: message.email.unwrap_or_default().trim().to_string(),
            message: message.message.unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.write().messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, DatabaseError> {
        Ok(self.read().messages.iter().rev().cloned().collect())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut tables = self.write();
        let now = Utc::now();
        // Expired entries can never match a valid token again
        tables.revoked.retain(|_, exp| *exp > now);
        tables.revoked.insert(jti, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.read().revoked.contains_key(&jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Someone".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn email_is_unique_and_case_insensitive() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("Admin@Example.com")).await.unwrap();
        assert_eq!(user.email, "admin@example.com");

        assert!(matches!(
            store.create_user(new_user("admin@example.com")).await,
            Err(DatabaseError::Conflict(_))
        ));
        assert_eq!(store.find_by_email("ADMIN@example.com").await.unwrap().map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn set_pin_on_missing_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_pin(Uuid::new_v4(), Some("h".into())).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn skills_sort_by_category_with_nulls_last() {
        let store = MemoryStore::new();
        for (name, category) in [("Axum", Some("Web")), ("Git", None), ("Rust", Some("Languages"))] {
            store
                .create_skill(NewSkill { name: Some(name.into()), category: category.map(Into::into), level: None })
                .await
                .unwrap();
        }

        let names: Vec<String> = store.list_skills().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Rust", "Axum", "Git"]);
    }

    #[tokio::test]
    async fn projects_list_newest_first() {
        let store = MemoryStore::new();
        for title in ["first", "second"] {
            let form = ValidProjectForm {
                title: title.into(),
                summary: "s".into(),
                description: None,
                stack: None,
                github: None,
                website: None,
            };
            store.create_project(form, title.into(), None).await.unwrap();
        }

        let titles: Vec<String> = store.list_projects().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn update_keeps_image_unless_replaced() {
        let store = MemoryStore::new();
        let form = ValidProjectForm {
            title: "t".into(),
            summary: "s".into(),
            description: None,
            stack: None,
            github: None,
            website: None,
        };
        let project = store.create_project(form.clone(), "t-1".into(), Some("projects/a.png".into())).await.unwrap();

        let updated = store.update_project(project.id, form, None).await.unwrap().unwrap();
        assert_eq!(updated.image.as_deref(), Some("projects/a.png"));
        assert_eq!(updated.slug, "t-1");
    }

    #[tokio::test]
    async fn revocation_is_tracked() {
        let store = MemoryStore::new();
        let jti = Uuid::new_v4();
        assert!(!store.is_revoked(jti).await.unwrap());

        store.revoke(jti, Utc::now() + chrono::Duration::hours(1)).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
    }
}
