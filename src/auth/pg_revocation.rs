/// Revoked token storage for PostgreSQL.
///
/// Shared by every server instance behind the load balancer, so a logout on
/// one node is honoured by all of them and survives restarts.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::auth::revocation::RevocationStore;
use crate::error::AppError;

#[derive(Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, jti: &str, remaining_ttl: Duration) -> Result<bool, AppError> {
        if remaining_ttl <= Duration::zero() {
            return Ok(false);
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(now + remaining_ttl)
        .bind(now)
        .execute(&self.pool)
        .await?;

        // Zero rows when another caller already holds this jti
        Ok(result.rows_affected() == 1)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        Ok(revoked)
    }

    async fn prune_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
