use axum::extract::FromRef;
use scrapeq_accounts::AccountsRepositories;
use scrapeq_auth::TokenService;

use crate::repository::JobsRepositories;

#[derive(Clone)]
pub struct JobsState {
    pub jobs: JobsRepositories,
    pub accounts: AccountsRepositories,
    pub tokens: TokenService,
}

impl FromRef<JobsState> for TokenService {
    fn from_ref(state: &JobsState) -> Self {
        state.tokens.clone()
    }
}
