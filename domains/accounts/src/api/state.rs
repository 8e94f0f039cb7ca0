use axum::extract::FromRef;
use scrapeq_auth::TokenService;

use crate::repository::AccountsRepositories;

#[derive(Clone)]
pub struct AccountsState {
    pub repos: AccountsRepositories,
    pub tokens: TokenService,
}

impl FromRef<AccountsState> for TokenService {
    fn from_ref(state: &AccountsState) -> Self {
        state.tokens.clone()
    }
}
