//! User account and session payload models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. New signups are always `User`; only an admin's
/// promote/demote actions flip this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserType {
    User,
    Admin,
}

impl UserType {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserType::Admin)
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserType::User => write!(f, "user"),
            UserType::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserType::User),
            "admin" => Ok(UserType::Admin),
            _ => Err(format!("Unknown user type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercase; the validator normalizes before any lookup or insert.
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build a fresh account record with the `user` role.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            user_type: UserType::User,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// The slice of a user that lives inside the session record.
///
/// This is a denormalized copy, not a reference: changing a user row (for
/// example promoting them) leaves already-issued sessions untouched until
/// the next login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
    pub email: String,
    pub user_type: UserType,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
        }
    }
}
