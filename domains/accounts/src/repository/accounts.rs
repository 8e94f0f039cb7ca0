//! Plain-pool read access to `accounts`. Contended mutations
//! (`reserve_request`, `report_outcome`, `reset_daily`) always go through
//! the row-locked `_tx` helpers in `transactions.rs`.

use chrono::Utc;
use scrapeq_common::{Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Account;

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn get(&self, id: Uuid) -> Result<Account> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {id} not found")))
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE user_id = $1 ORDER BY created_at ASC",
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// `list_eligible` applies the eligibility predicate in SQL so large
    /// account sets don't need to round-trip entirely into memory.
    pub async fn list_eligible(&self, user_id: Uuid) -> Result<Vec<Account>> {
        let now = Utc::now();
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE user_id = $1
              AND status IN ('active', 'pending')
              AND (cooldown_until IS NULL OR cooldown_until <= $2)
              AND (blocked_until IS NULL OR blocked_until <= $2)
              AND requests_today < daily_request_limit
            ORDER BY requests_today ASC, last_request_at ASC NULLS FIRST
            "#,
        )
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, account: &Account) -> Result<Account> {
        let created = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                id, user_id, session_material, status, daily_request_limit, requests_today,
                last_request_at, cooldown_until, blocked_until, consecutive_failures,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
            .bind(account.id)
            .bind(account.user_id)
            .bind(&account.session_material)
            .bind(account.status)
            .bind(account.daily_request_limit)
            .bind(account.requests_today)
            .bind(account.last_request_at)
            .bind(account.cooldown_until)
            .bind(account.blocked_until)
            .bind(account.consecutive_failures)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }
}
