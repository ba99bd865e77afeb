use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user joined with its role. The role columns are nullable so a row still
/// loads if the reference is ever left dangling.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRoleRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role_name: Option<String>,
    pub role_permissions: Option<Vec<String>>,
    pub role_description: Option<String>,
    pub role_created_at: Option<DateTime<Utc>>,
    pub role_updated_at: Option<DateTime<Utc>>,
}

impl UserRoleRow {
    pub fn role(&self) -> Option<Role> {
        Some(Role {
            id: self.role_id,
            name: self.role_name.clone()?,
            permissions: self.role_permissions.clone().unwrap_or_default(),
            description: self.role_description.clone(),
            created_at: self.role_created_at?,
            updated_at: self.role_updated_at?,
        })
    }
}

/// Public shape of a user: the role is embedded in full.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRoleRow> for UserResponse {
    fn from(row: UserRoleRow) -> Self {
        let role = row.role();
        UserResponse {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            created_at: row.created_at,
        }
    }
}
