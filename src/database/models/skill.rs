use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub level: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSkill {
    pub name: Option<String>,
    pub category: Option<String>,
    pub level: Option<i32>,
}

impl NewSkill {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", self.name.as_deref(), Some(100));
        errors.max_chars("category", self.category.as_deref(), Some(50));
        errors.range("level", self.level, 0, 100);
        errors.into_result()
    }
}

/// Partial update: absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub level: Option<i32>,
}

impl SkillPatch {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.is_some() {
            errors.required_text("name", self.name.as_deref(), Some(100));
        }
        errors.max_chars("category", self.category.as_deref(), Some(50));
        errors.range("level", self.level, 0, 100);
        errors.into_result()
    }

    pub fn apply(&self, skill: &mut Skill) {
        if let Some(name) = &self.name {
            skill.name = name.trim().to_string();
        }
        if let Some(category) = &self.category {
            skill.category = Some(category.clone());
        }
        if let Some(level) = self.level {
            skill.level = Some(level);
        }
    }
}
