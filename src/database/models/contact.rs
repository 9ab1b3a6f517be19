use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContactMessage {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl NewContactMessage {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", self.name.as_deref(), Some(100));
        errors.required_text("email", self.email.as_deref(), Some(150));
        errors.email("email", self.email.as_deref());
        errors.required_text("message", self.message.as_deref(), None);
        errors.min_chars("message", self.message.as_deref(), 10);
        errors.into_result()
    }
}
