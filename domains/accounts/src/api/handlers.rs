use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scrapeq_auth::AuthUser;
use scrapeq_common::{Error, Result};

use crate::domain::{Account, User};

use super::password::{hash_password, verify_password};
use super::state::AccountsState;

const DEFAULT_SIGNUP_CREDITS: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub access_token: String,
}

pub async fn register(
    State(state): State<AccountsState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    if state.repos.users.find_by_email(&body.email).await?.is_some() {
        return Err(Error::Conflict(format!("{} is already registered", body.email)));
    }

    let password_hash = hash_password(&body.password)?;
    let user = User::new(&body.email, password_hash, DEFAULT_SIGNUP_CREDITS);
    user.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let created = state.repos.users.create(&user).await?;

    let access_token = state
        .tokens
        .issue_access(created.id)
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(Json(AuthResponse {
        user_id: created.id,
        access_token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AccountsState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .repos
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| Error::Authentication("invalid email or password".to_string()))?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(Error::Authentication("invalid email or password".to_string()));
    }

    let access_token = state
        .tokens
        .issue_access(user.id)
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(Json(AuthResponse {
        user_id: user.id,
        access_token,
    }))
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub credits_balance: i64,
    pub credits_used: i64,
    pub max_concurrent_jobs: i32,
    pub max_monthly_jobs: i32,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            credits_balance: u.credits_balance,
            credits_used: u.credits_used,
            max_concurrent_jobs: u.max_concurrent_jobs,
            max_monthly_jobs: u.max_monthly_jobs,
        }
    }
}

pub async fn get_profile(
    State(state): State<AccountsState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>> {
    let user = state.repos.users.get(user_id).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub session_material: String,
    #[serde(default = "default_daily_limit")]
    pub daily_request_limit: i32,
}

fn default_daily_limit() -> i32 {
    150
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub status: String,
    pub daily_request_limit: i32,
    pub requests_today: i32,
    pub consecutive_failures: i32,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            status: format!("{:?}", a.status).to_lowercase(),
            daily_request_limit: a.daily_request_limit,
            requests_today: a.requests_today,
            consecutive_failures: a.consecutive_failures,
        }
    }
}

pub async fn create_account(
    State(state): State<AccountsState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>> {
    if body.session_material.trim().is_empty() {
        return Err(Error::Validation("session_material must not be empty".to_string()));
    }
    let account = Account::new(user_id, body.session_material, body.daily_request_limit);
    let created = state.repos.accounts.create(&account).await?;
    Ok(Json(created.into()))
}

pub async fn list_accounts(
    State(state): State<AccountsState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AccountResponse>>> {
    let accounts = state.repos.accounts.list_by_user(user_id).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

pub async fn get_account(
    State(state): State<AccountsState>,
    AuthUser(user_id): AuthUser,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>> {
    let account = state.repos.accounts.get(account_id).await?;
    if account.user_id != user_id {
        return Err(Error::NotFound(format!("account {account_id} not found")));
    }
    Ok(Json(account.into()))
}
