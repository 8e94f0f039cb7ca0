//! Configuration management following 12-factor app principles.
//!
//! All configuration is loaded from environment variables so code and
//! config stay cleanly separated.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub queue_url: String,

    pub user_token_secret: String,
    pub job_token_secret: String,
    pub job_token_ttl: Duration,
    pub lease_duration: Duration,

    pub worker_concurrency: u32,
    pub port: u16,

    pub max_file_size_bytes: u64,
    pub max_files_per_upload: u32,
    pub result_files_dir: String,
}

impl Config {
    /// Load configuration from environment variables, failing fast on any
    /// missing required variable.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let user_token_secret = env::var("USER_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("USER_TOKEN_SECRET is required"))?;
        let job_token_secret = env::var("JOB_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("JOB_TOKEN_SECRET is required"))?;
        if user_token_secret == job_token_secret {
            return Err(anyhow::anyhow!(
                "USER_TOKEN_SECRET and JOB_TOKEN_SECRET must be distinct"
            ));
        }

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,
            queue_url: env::var("QUEUE_URL")
                .map_err(|_| anyhow::anyhow!("QUEUE_URL is required"))?,

            user_token_secret,
            job_token_secret,
            job_token_ttl: parse_duration(&env::var("JOB_TOKEN_TTL").unwrap_or_else(|_| "1h".into()))?,
            lease_duration: parse_duration(
                &env::var("LEASE_DURATION").unwrap_or_else(|_| "5m".into()),
            )?,

            worker_concurrency: env::var("WORKER_CONCURRENCY")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()
                .unwrap_or(5001),

            max_file_size_bytes: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| parse_byte_size(&v))
                .unwrap_or(50 * 1024 * 1024),
            max_files_per_upload: env::var("MAX_FILES_PER_UPLOAD")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            result_files_dir: env::var("RESULT_FILES_DIR")
                .unwrap_or_else(|_| "./data/result_files".to_string()),
        };

        Ok(config)
    }
}

/// Parse a duration expressed as `<number><unit>` where unit is one of
/// `s`, `m`, `h` (e.g. `"30s"`, `"5m"`, `"1h"`).
fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.len().saturating_sub(1));
    let n: u64 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration literal: {raw}"))?;
    match unit {
        "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        _ => Err(anyhow::anyhow!("invalid duration unit in: {raw}")),
    }
}

/// Parse a byte-size literal such as `"50 MiB"` or `"1048576"`.
fn parse_byte_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let lower = raw.to_lowercase().replace(' ', "");
    if let Some(n) = lower.strip_suffix("mib") {
        return n.parse::<u64>().ok().map(|v| v * 1024 * 1024);
    }
    if let Some(n) = lower.strip_suffix("kib") {
        return n.parse::<u64>().ok().map(|v| v * 1024);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_variants() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_rejects_unknown_unit() {
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn test_parse_byte_size_mib_and_plain() {
        assert_eq!(parse_byte_size("50 MiB"), Some(50 * 1024 * 1024));
        assert_eq!(parse_byte_size("1048576"), Some(1048576));
        assert_eq!(parse_byte_size("4KiB"), Some(4096));
    }

    #[test]
    #[ignore] // requires a fully populated environment; run locally only
    fn test_config_from_env_loads_successfully() {
        let result = Config::from_env();
        assert!(result.is_ok());
    }
}
