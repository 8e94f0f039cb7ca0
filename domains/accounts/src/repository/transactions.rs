//! Row-locked mutations composed inside a caller-owned transaction.
//!
//! Every function here takes `&mut Transaction<'_, Postgres>` so it can
//! be combined with writes from other domains inside one atomic unit.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use scrapeq_common::{Error, Result};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, AccountBusy, OutcomeKind, User};

/// Locks the user's credit row and returns it. Callers hold the lock for
/// the remainder of the transaction.
pub async fn lock_user_for_update_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<User> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {user_id} not found")))?;
    Ok(user)
}

/// Debits `amount` from the already-locked user's balance and records
/// the usage. Caller must have validated `balance >= amount` first.
pub async fn debit_credits_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
) -> Result<User> {
    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET credits_balance = credits_balance - $2,
            credits_used = credits_used + $2,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
    Ok(updated)
}

/// Locks an account row, re-checks eligibility and reserves one request
/// slot, all inside one statement pair — the single cross-thread mutual
/// exclusion point for concurrent dispatch.
pub async fn reserve_request_tx(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
) -> Result<std::result::Result<Account, AccountBusy>> {
    let mut account =
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {account_id} not found")))?;

    let now = Utc::now();
    if account.reserve_request(now).is_err() {
        return Ok(Err(AccountBusy));
    }

    let persisted = persist_account(tx, &account).await?;
    account = persisted;
    Ok(Ok(account))
}

/// Locks an account row and applies `report_outcome`, persisting the
/// result.
pub async fn report_outcome_tx(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    kind: OutcomeKind,
    hard_failure_block: Option<ChronoDuration>,
) -> Result<Account> {
    let mut account =
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {account_id} not found")))?;

    account
        .report_outcome(kind, Utc::now(), hard_failure_block)
        .map_err(|e| Error::Internal(e.to_string()))?;

    persist_account(tx, &account).await
}

/// Reconciler task: `requests_today := 0` for every account.
pub async fn reset_daily_tx(tx: &mut Transaction<'_, Postgres>) -> Result<u64> {
    let result = sqlx::query("UPDATE accounts SET requests_today = 0, updated_at = now()")
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Reconciler task: clear `cooldown_until`/`blocked_until` for accounts
/// whose deadlines have passed.
pub async fn unblock_expired_tx(tx: &mut Transaction<'_, Postgres>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET cooldown_until = CASE WHEN cooldown_until <= $1 THEN NULL ELSE cooldown_until END,
            blocked_until = CASE WHEN blocked_until <= $1 THEN NULL ELSE blocked_until END,
            updated_at = now()
        WHERE (cooldown_until IS NOT NULL AND cooldown_until <= $1)
           OR (blocked_until IS NOT NULL AND blocked_until <= $1)
        "#,
    )
        .bind(now)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

async fn persist_account(tx: &mut Transaction<'_, Postgres>, account: &Account) -> Result<Account> {
    let updated = sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts
        SET status = $2, requests_today = $3, last_request_at = $4,
            cooldown_until = $5, blocked_until = $6, consecutive_failures = $7,
            updated_at = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
        .bind(account.id)
        .bind(account.status)
        .bind(account.requests_today)
        .bind(account.last_request_at)
        .bind(account.cooldown_until)
        .bind(account.blocked_until)
        .bind(account.consecutive_failures)
        .bind(account.updated_at)
        .fetch_one(&mut **tx)
        .await?;
    Ok(updated)
}
