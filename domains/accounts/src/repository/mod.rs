pub mod accounts;
pub mod transactions;
pub mod users;

use sqlx::{PgPool, Postgres, Transaction};

pub use accounts::AccountRepository;
pub use users::UserRepository;

use scrapeq_common::Result;

/// Repository handle group for the Account Registry domain.
#[derive(Debug, Clone)]
pub struct AccountsRepositories {
    pool: PgPool,
    pub users: UserRepository,
    pub accounts: AccountRepository,
}

impl AccountsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}
