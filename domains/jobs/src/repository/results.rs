//! Result persistence with idempotent de-duplication.

use scrapeq_common::{Error, Result};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{JobType, ResultFile, ResultRow};

#[derive(Debug, Clone)]
pub struct ResultRepository {
    pool: PgPool,
}

impl ResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn hash_payload(payload: &Value) -> String {
        let canonical = serde_json::to_vec(payload).unwrap_or_default();
        blake3::hash(&canonical).to_hex().to_string()
    }

    /// Inserts a result row unless a row with the same
    /// `(url_item_id, payload_hash)` already exists, in which case the
    /// existing row is returned and `is_new` is `false` — this is what
    /// makes retried `submit` callbacks safe.
    pub async fn insert_if_new(
        &self,
        job_id: Uuid,
        url_item_id: Option<Uuid>,
        job_type: JobType,
        payload: Value,
    ) -> Result<(ResultRow, bool)> {
        let payload_hash = Self::hash_payload(&payload);

        if let Some(existing) = self.find_by_hash(url_item_id, &payload_hash).await? {
            return Ok((existing, false));
        }

        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            INSERT INTO result_rows (id, job_id, url_item_id, job_type, payload, payload_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (url_item_id, payload_hash) DO UPDATE SET job_id = EXCLUDED.job_id
            RETURNING *
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(url_item_id)
            .bind(job_type)
            .bind(Json(payload))
            .bind(&payload_hash)
            .fetch_one(&self.pool)
            .await?;

        Ok((row, true))
    }

    async fn find_by_hash(&self, url_item_id: Option<Uuid>, payload_hash: &str) -> Result<Option<ResultRow>> {
        let row = sqlx::query_as::<_, ResultRow>(
            "SELECT * FROM result_rows WHERE url_item_id IS NOT DISTINCT FROM $1 AND payload_hash = $2",
        )
            .bind(url_item_id)
            .bind(payload_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_for_job(&self, job_id: Uuid, limit: i64, offset: i64) -> Result<Vec<ResultRow>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            "SELECT * FROM result_rows WHERE job_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
            .bind(job_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count_for_job(&self, job_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM result_rows WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn insert_file(
        &self,
        job_id: Uuid,
        original_name: &str,
        stored_path: &str,
        size_bytes: i64,
        content_type: &str,
    ) -> Result<ResultFile> {
        if size_bytes > super::MAX_RESULT_FILE_SIZE_BYTES {
            return Err(Error::PayloadTooLarge(format!(
                "file {original_name} is {size_bytes} bytes, limit is {}",
                super::MAX_RESULT_FILE_SIZE_BYTES
            )));
        }
        let file = sqlx::query_as::<_, ResultFile>(
            r#"
            INSERT INTO result_files (id, job_id, original_name, stored_path, size_bytes, content_type, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            RETURNING *
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(original_name)
            .bind(stored_path)
            .bind(size_bytes)
            .bind(content_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(file)
    }

    pub async fn list_files_for_job(&self, job_id: Uuid) -> Result<Vec<ResultFile>> {
        let files = sqlx::query_as::<_, ResultFile>(
            "SELECT * FROM result_files WHERE job_id = $1 ORDER BY uploaded_at ASC",
        )
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_payload_is_stable_for_identical_payload() {
        let a = ResultRepository::hash_payload(&json!({"name": "Alice", "id": 1}));
        let b = ResultRepository::hash_payload(&json!({"name": "Alice", "id": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_payload_differs_for_different_payload() {
        let a = ResultRepository::hash_payload(&json!({"name": "Alice"}));
        let b = ResultRepository::hash_payload(&json!({"name": "Bob"}));
        assert_ne!(a, b);
    }
}
