//! Auth configuration.

use std::time::Duration;

/// Signing configuration for both token kinds. The two secrets are kept
/// distinct so compromising the job-token secret cannot forge a user
/// access token and vice versa.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub user_token_secret: String,
    pub job_token_secret: String,
    pub job_token_ttl: Duration,
}
