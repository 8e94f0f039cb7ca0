//! Rate Limiter: a per-principal sliding-window request cap
//! in front of every API surface, keyed by route class.
//!
//! Built on `governor`'s keyed GCRA limiter.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovernorLimiter,
};
use serde_json::json;

/// Route classes recognized by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Login,
    Register,
    JobManagement,
    AccountManagement,
    WorkerSync,
}

impl RouteClass {
    /// `(window_seconds, max_requests)` for this route class.
    pub fn limits(&self) -> (u64, u32) {
        match self {
            RouteClass::Login => (900, 5),
            RouteClass::Register => (900, 10),
            RouteClass::JobManagement => (900, 30),
            RouteClass::AccountManagement => (900, 50),
            RouteClass::WorkerSync => (300, 100),
        }
    }
}

type Keyed = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// A single route class's limiter, advisory and best-effort — no
/// cross-node consistency is attempted.
pub struct ClassLimiter {
    inner: Keyed,
    window_seconds: u64,
}

impl ClassLimiter {
    pub fn new(class: RouteClass) -> Arc<Self> {
        let (window_seconds, max_requests) = class.limits();
        let period = Duration::from_secs(window_seconds) / max_requests.max(1);
        let quota = Quota::with_period(period)
            .expect("route class limits always yield a positive period")
            .allow_burst(NonZeroU32::new(max_requests.max(1)).unwrap());
        Arc::new(Self {
            inner: GovernorLimiter::keyed(quota),
            window_seconds,
        })
    }

    /// Returns `Ok(())` if `principal` may proceed, or `Err(retry_after)`
    /// in seconds otherwise.
    pub fn check(&self, principal: &str) -> Result<(), u64> {
        match self.inner.check_key(&principal.to_string()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait.as_secs().max(1).min(self.window_seconds))
            }
        }
    }
}

/// The principal key a request is rate-limited by: the bearer token
/// verbatim if present (approximates per-user), else the remote IP.
fn principal_key<B>(req: &Request<B>, addr: Option<SocketAddr>) -> String {
    if let Some(value) = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return value.to_string();
    }
    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn rate_limited_response(retry_after_secs: u64) -> Response {
    let body = Json(json!({
        "error": {
            "code": "rate_limited",
            "message": "too many requests",
            "retry_after_seconds": retry_after_secs,
        }
    }));
    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response.headers_mut().insert(
        "Retry-After",
        retry_after_secs.to_string().parse().unwrap(),
    );
    response
}

/// Axum middleware enforcing one route class's limiter. Attach per
/// sub-router with `axum::middleware::from_fn_with_state`.
pub async fn enforce(
    State(limiter): State<Arc<ClassLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = principal_key(&req, Some(addr));
    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(principal = %key, retry_after_secs = retry_after, "rate limited");
            rate_limited_response(retry_after)
        }
    }
}
