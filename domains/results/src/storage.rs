//! Local disk storage for uploaded result files. Bytes live out of band
//! from Postgres; only the path and metadata are recorded in `result_files`.

use scrapeq_common::{Error, Result};
use uuid::Uuid;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "text/csv",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/xml",
    "text/xml",
];

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

/// Writes `bytes` under `base_dir/<job_id>/<uuid>-<original_name>` and
/// returns the path to persist in `result_files.stored_path`.
pub async fn save_file(
    base_dir: &str,
    job_id: Uuid,
    original_name: &str,
    bytes: &[u8],
) -> Result<String> {
    let dir = format!("{base_dir}/{job_id}");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Internal(format!("failed to create result file directory: {e}")))?;

    let safe_name = original_name.replace(['/', '\\'], "_");
    let stored_path = format!("{dir}/{}-{safe_name}", Uuid::new_v4());
    tokio::fs::write(&stored_path, bytes)
        .await
        .map_err(|e| Error::Internal(format!("failed to write result file: {e}")))?;

    Ok(stored_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_content_types_accepts_json_and_csv() {
        assert!(is_allowed_content_type("application/json"));
        assert!(is_allowed_content_type("text/csv"));
    }

    #[test]
    fn test_allowed_content_types_rejects_unknown() {
        assert!(!is_allowed_content_type("application/x-executable"));
    }
}
