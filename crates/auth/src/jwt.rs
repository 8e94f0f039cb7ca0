//! Token issuing and verification.
//!
//! Both token kinds are HS256 bearer tokens signed with independent
//! secrets. `60s` of clock-skew leeway is applied on
//! verification of both kinds.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use uuid::Uuid;

use crate::claims::{JobClaims, UserClaims, KIND_ACCESS, KIND_JOB};
use crate::config::AuthConfig;
use crate::error::TokenError;

const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;

fn validation() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_aud = false;
    v.leeway = CLOCK_SKEW_LEEWAY_SECS;
    v
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::Base64(_) => TokenError::Malformed,
        _ => TokenError::Malformed,
    }
}

/// Token issuance and verification for both bearer-token kinds.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a long-lived user access token.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user_id,
            kind: KIND_ACCESS.to_string(),
            iat: now,
            exp: now + Duration::from_secs(30 * 24 * 3600).as_secs() as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.user_token_secret.as_bytes()),
        )
            .map_err(|_| TokenError::Malformed)
    }

    /// Verify a user access token, returning the carried user id.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(self.config.user_token_secret.as_bytes()),
            &validation(),
        )
            .map_err(classify)?;
        if data.claims.kind != KIND_ACCESS {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims.sub)
    }

    /// Issue a short-lived job capability token scoped to one job.
    pub fn issue_job(&self, job_id: Uuid, user_id: Uuid, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = JobClaims {
            job_id,
            user_id,
            kind: KIND_JOB.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.job_token_secret.as_bytes()),
        )
            .map_err(|_| TokenError::Malformed)
    }

    /// Verify a job capability token, returning its `(job_id, user_id)` scope.
    pub fn verify_job(&self, token: &str) -> Result<JobClaims, TokenError> {
        let data = decode::<JobClaims>(
            token,
            &DecodingKey::from_secret(self.config.job_token_secret.as_bytes()),
            &validation(),
        )
            .map_err(classify)?;
        if data.claims.kind != KIND_JOB {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            user_token_secret: "user-secret-one".to_string(),
            job_token_secret: "job-secret-two".to_string(),
            job_token_ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let svc = TokenService::new(config());
        let user_id = Uuid::new_v4();
        let token = svc.issue_access(user_id).unwrap();
        assert_eq!(svc.verify_access(&token).unwrap(), user_id);
    }

    #[test]
    fn test_job_token_roundtrip() {
        let svc = TokenService::new(config());
        let job_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let token = svc.issue_job(job_id, user_id, Duration::from_secs(3600)).unwrap();
        let claims = svc.verify_job(&token).unwrap();
        assert_eq!(claims.job_id, job_id);
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn test_job_token_rejected_by_access_verifier_independent_secrets() {
        let svc = TokenService::new(config());
        let job_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let job_token = svc.issue_job(job_id, user_id, Duration::from_secs(3600)).unwrap();
        // Signed with the job secret; verifying as an access token (user secret) must fail.
        let result = svc.verify_access(&job_token);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_token_is_malformed() {
        let svc = TokenService::new(config());
        let result = svc.verify_access("not-a-jwt");
        assert_eq!(result.unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_bad_signature_detected() {
        let svc_a = TokenService::new(config());
        let mut other_config = config();
        other_config.user_token_secret = "a-completely-different-secret".to_string();
        let svc_b = TokenService::new(other_config);

        let token = svc_a.issue_access(Uuid::new_v4()).unwrap();
        let result = svc_b.verify_access(&token);
        assert_eq!(result.unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn test_expired_token_detected() {
        let svc = TokenService::new(config());
        let claims = UserClaims {
            sub: Uuid::new_v4(),
            kind: KIND_ACCESS.to_string(),
            iat: Utc::now().timestamp() - 1000,
            exp: Utc::now().timestamp() - 500,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().user_token_secret.as_bytes()),
        )
            .unwrap();
        assert_eq!(svc.verify_access(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_clock_skew_leeway_tolerates_slightly_expired_token() {
        let svc = TokenService::new(config());
        let claims = UserClaims {
            sub: Uuid::new_v4(),
            kind: KIND_ACCESS.to_string(),
            iat: Utc::now().timestamp() - 100,
            exp: Utc::now().timestamp() - 30, // expired 30s ago, within the 60s leeway
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().user_token_secret.as_bytes()),
        )
            .unwrap();
        assert!(svc.verify_access(&token).is_ok());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let svc = TokenService::new(config());
        // Craft an access-kind claim set but sign with the job secret and
        // verify via verify_job: kind mismatch must surface, not a panic.
        let claims = UserClaims {
            sub: Uuid::new_v4(),
            kind: KIND_ACCESS.to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().job_token_secret.as_bytes()),
        )
            .unwrap();
        // Structurally decodes as JobClaims would fail on missing fields (Malformed);
        // this asserts verify_job never silently accepts an access-shaped token.
        assert!(svc.verify_job(&token).is_err());
    }
}
