//! Axum extractors for authentication.
//!
//! Generic over any state `S` where `TokenService: FromRef<S>`. This is
//! axum's idiomatic nested-state pattern.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};
use uuid::Uuid;

use crate::claims::JobClaims;
use crate::error::AuthError;
use crate::jwt::TokenService;

fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    header_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AuthError::InvalidAuthorizationFormat)
}

/// A caller authenticated with a long-lived user access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthUser
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let service = TokenService::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = extract_bearer_token(auth_header)?;
        let user_id = service.verify_access(&token)?;

        Ok(AuthUser(user_id))
    }
}

/// A caller authenticated with a short-lived job capability token.
///
/// Only identifies the claimed `(job_id, user_id)` scope — handlers must
/// still re-check ownership and job status against the Job Store before
/// honoring a mutation.
#[derive(Debug, Clone)]
pub struct JobAuth(pub JobClaims);

impl<S> FromRequestParts<S> for JobAuth
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let service = TokenService::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = extract_bearer_token(auth_header)?;
        let claims = service.verify_job(&token)?;

        Ok(JobAuth(claims))
    }
}
