//! The User entity: credit balance and per-user concurrency caps.

use chrono::{DateTime, Utc};
use scrapeq_common::Error;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub credits_balance: i64,
    pub credits_used: i64,
    pub max_concurrent_jobs: i32,
    pub max_monthly_jobs: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, initial_credits: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            credits_balance: initial_credits,
            credits_used: 0,
            max_concurrent_jobs: 5,
            max_monthly_jobs: 500,
            created_at: now,
            updated_at: now,
        }
    }

    /// Invariant: balance is never negative and usage never decreases.
    pub fn validate(&self) -> Result<(), Error> {
        if self.credits_balance < 0 {
            return Err(Error::Validation(
                "credits_balance must not be negative".to_string(),
            ));
        }
        if self.credits_used < 0 {
            return Err(Error::Validation(
                "credits_used must not be negative".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(Error::Validation("email must be valid".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_zero_usage() {
        let u = User::new("a@b.com", "hash", 10);
        assert_eq!(u.credits_used, 0);
        assert_eq!(u.credits_balance, 10);
    }

    #[test]
    fn test_validate_rejects_negative_balance() {
        let mut u = User::new("a@b.com", "hash", 10);
        u.credits_balance = -1;
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_email() {
        let mut u = User::new("a@b.com", "hash", 10);
        u.email = "not-an-email".to_string();
        assert!(u.validate().is_err());
    }
}
