use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use crate::auth::{Identity, Role};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub transaction_pin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            role: self.role,
            pin_hash: self.transaction_pin.clone(),
        }
    }

    pub fn has_pin(&self) -> bool {
        self.transaction_pin.is_some()
    }
}

// Role is stored as text; map unknown values to a decode error instead of panicking
impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse::<Role>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            role,
            transaction_pin: row.try_get("transaction_pin")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert payload; secrets arrive already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_omits_secrets() {
        let user = User {
            id: Uuid::nil(),
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "$argon2id$password".to_string(),
            role: Role::Admin,
            transaction_pin: Some("$argon2id$pin".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "admin");
        assert!(value.get("password").is_none());
        assert!(value.get("transaction_pin").is_none());
        assert!(user.identity().has_pin());
    }
}
