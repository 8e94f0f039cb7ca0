use axum::extract::FromRef;
use scrapeq_auth::TokenService;
use scrapeq_jobs::JobsRepositories;

#[derive(Clone)]
pub struct ResultsState {
    pub jobs: JobsRepositories,
    pub tokens: TokenService,
    pub result_files_dir: String,
    pub max_file_size_bytes: i64,
    pub max_files_per_upload: usize,
}

impl FromRef<ResultsState> for TokenService {
    fn from_ref(state: &ResultsState) -> Self {
        state.tokens.clone()
    }
}
