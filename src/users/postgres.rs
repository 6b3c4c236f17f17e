use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{user_not_found, NewUser, Role, User, UserChanges, UserDirectory};
use crate::error::{AppError, AuthError, DatabaseError};

const USER_COLUMNS: &str =
    "id, email, phone_number, first_name, last_name, password_hash, role, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    phone_number: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            AppError::Database(DatabaseError::UnexpectedError(format!(
                "unknown role {:?} for user {}",
                row.role, row.id
            )))
        })?;

        Ok(User {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

/// Turn a unique violation on `users` into `DuplicateUser`
fn duplicate_user(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Database(DatabaseError::UniqueConstraintViolation(constraint)) => {
            let field = if constraint.contains("phone") {
                "phone number"
            } else {
                "email"
            };
            AuthError::DuplicateUser(field.to_string()).into()
        }
        other => other,
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, phone_number, first_name, last_name, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new_user.email)
        .bind(&new_user.phone_number)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_user)?;

        User::try_from(row)
    }

    async fn get(&self, id: i64) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| user_not_found(id))?;

        User::try_from(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("email", email).await
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("phone_number", phone_number).await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET phone_number = COALESCE($2, phone_number),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                password_hash = COALESCE($5, password_hash)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&changes.phone_number)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(duplicate_user)?
        .ok_or_else(|| user_not_found(id))?;

        User::try_from(row)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id OFFSET $1 LIMIT $2",
            USER_COLUMNS
        ))
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }
}
