/// User directory
///
/// Storage-agnostic access to user accounts. `PgUserDirectory` backs the
/// running service; `InMemoryUserDirectory` serves tests and single-node
/// development setups.

mod memory;
mod postgres;

pub use memory::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Validated fields of an account about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub phone_number: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Errors
    /// `AuthError::DuplicateUser` when the email or phone number is taken
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// # Errors
    /// `DatabaseError::NotFound` when no user has this id
    async fn get(&self, id: i64) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, AppError>;

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError>;

    /// Users ordered by id, paginated
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

pub(crate) fn user_not_found(id: i64) -> AppError {
    crate::error::DatabaseError::NotFound(format!("User with id={}", id)).into()
}

#[cfg(test)]
pub(crate) fn test_user(id: i64, email: &str, role: Role) -> User {
    User {
        id,
        email: email.to_string(),
        phone_number: None,
        first_name: None,
        last_name: None,
        password_hash: String::new(),
        role,
        created_at: Utc::now(),
    }
}
