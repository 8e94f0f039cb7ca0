pub mod jobs;
pub mod queue;
pub mod results;
pub mod transactions;
pub mod url_items;

use sqlx::{PgPool, Postgres, Transaction};

pub use jobs::JobRepository;
pub use queue::{QueueItem, QueueRepository};
pub use results::ResultRepository;
pub use url_items::UrlItemRepository;

use scrapeq_common::Result;

/// Maximum size of a single uploaded result file: 50 MiB.
pub const MAX_RESULT_FILE_SIZE_BYTES: i64 = 50 * 1024 * 1024;
/// Maximum number of files accepted in a single upload call.
pub const MAX_RESULT_FILES_PER_UPLOAD: usize = 5;

#[derive(Debug, Clone)]
pub struct JobsRepositories {
    pool: PgPool,
    pub jobs: JobRepository,
    pub url_items: UrlItemRepository,
    pub results: ResultRepository,
    pub queue: QueueRepository,
}

impl JobsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            url_items: UrlItemRepository::new(pool.clone()),
            results: ResultRepository::new(pool.clone()),
            queue: QueueRepository::new(pool.clone()),
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
