//! Plain-pool read/write access to `users`. Write paths that must be
//! composed inside a caller-owned transaction live in `transactions.rs`.

use scrapeq_common::{Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::User;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {id} not found")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, credits_balance, credits_used, max_concurrent_jobs, max_monthly_jobs, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.credits_balance)
            .bind(user.credits_used)
            .bind(user.max_concurrent_jobs)
            .bind(user.max_monthly_jobs)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }
}
