use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{user_not_found, NewUser, User, UserChanges, UserDirectory};
use crate::error::{AppError, AuthError};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

/// Mutex-guarded user table with the same uniqueness rules as the `users` schema
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    table: Arc<Mutex<Table>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut table = self.table();

        if table.rows.values().any(|u| u.email == new_user.email) {
            return Err(AuthError::DuplicateUser("email".to_string()).into());
        }
        if table
            .rows
            .values()
            .any(|u| u.phone_number.as_deref() == Some(new_user.phone_number.as_str()))
        {
            return Err(AuthError::DuplicateUser("phone number".to_string()).into());
        }

        table.next_id += 1;
        let user = User {
            id: table.next_id,
            email: new_user.email,
            phone_number: Some(new_user.phone_number),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<User, AppError> {
        self.table()
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| user_not_found(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.table().rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .table()
            .rows
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let mut table = self.table();

        if let Some(phone) = changes.phone_number.as_deref() {
            if table
                .rows
                .values()
                .any(|u| u.id != id && u.phone_number.as_deref() == Some(phone))
            {
                return Err(AuthError::DuplicateUser("phone number".to_string()).into());
            }
        }

        let user = table.rows.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        if let Some(phone) = changes.phone_number {
            user.phone_number = Some(phone);
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        Ok(user.clone())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
        Ok(self
            .table()
            .rows
            .values()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.table().rows.len() as i64)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.table()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| user_not_found(id))
    }
}
