//! Admission Controller: the only place a job is created.
//! Validates the request, debits credits, freezes the account
//! assignment set and enqueues the job, all inside one transaction.

use std::collections::HashSet;

use serde_json::Value;
use uuid::Uuid;

use scrapeq_accounts::repository::{accounts::AccountRepository, transactions::lock_user_for_update_tx};
use scrapeq_accounts::repository::transactions::debit_credits_tx;
use scrapeq_common::{Error, Result};

use crate::domain::{Job, JobType, UrlWorkItem};
use crate::repository::transactions::create_job_tx;
use crate::repository::JobsRepositories;

/// Job cost is a flat `max(distinct_urls.len(), 1)` credits, charged once
/// at admission regardless of how the job ultimately resolves.
fn required_credits(distinct_url_count: usize) -> i64 {
    distinct_url_count.max(1) as i64
}

/// Accepted hosts for submitted URLs: LinkedIn and its subdomains.
const ALLOWED_HOST_SUFFIXES: &[&str] = &["linkedin.com"];

fn extract_host(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host = authority.rsplit('@').next().unwrap_or(authority);
    Some(host.split(':').next().unwrap_or(host))
}

fn is_allowed_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    ALLOWED_HOST_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
}

fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Validation(format!("not an http(s) url: {url}")));
    }
    let host = extract_host(url)
        .ok_or_else(|| Error::Validation(format!("not an http(s) url: {url}")))?;
    if !is_allowed_host(host) {
        return Err(Error::Validation(format!(
            "url host is not on the allow-list: {url}"
        )));
    }
    Ok(())
}

/// Parses `configuration.selected_account_ids` (a JSON array of UUID
/// strings). Absent, non-array, or unparsable entries are treated as
/// "no selection" rather than an error.
fn selected_account_ids(configuration: &Value) -> Vec<Uuid> {
    configuration
        .get("selected_account_ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .filter_map(|id| Uuid::parse_str(id).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub struct SubmitJobRequest {
    pub user_id: Uuid,
    pub job_type: JobType,
    pub urls: Vec<String>,
    pub max_results: i32,
    pub configuration: Value,
    pub idempotency_key: Option<String>,
}

impl SubmitJobRequest {
    /// De-duplicates `urls`, preserving first-seen order. Credits and the
    /// admitted work-item count are both keyed off this list, never off
    /// the raw request.
    pub fn distinct_urls(&self) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.urls.len());
        self.urls
            .iter()
            .filter(|url| seen.insert((*url).clone()))
            .cloned()
            .collect()
    }

    pub fn validate(&self, distinct_urls: &[String]) -> Result<()> {
        if distinct_urls.is_empty() {
            return Err(Error::Validation("urls must not be empty".to_string()));
        }
        if distinct_urls.len() > 10_000 {
            return Err(Error::Validation(
                "a job may not contain more than 10000 urls".to_string(),
            ));
        }
        if self.max_results <= 0 {
            return Err(Error::Validation("max_results must be positive".to_string()));
        }
        for url in distinct_urls {
            validate_url(url)?;
        }
        Ok(())
    }
}

pub struct AdmissionController<'a> {
    jobs: &'a JobsRepositories,
    accounts: &'a AccountRepository,
}

impl<'a> AdmissionController<'a> {
    pub fn new(jobs: &'a JobsRepositories, accounts: &'a AccountRepository) -> Self {
        Self { jobs, accounts }
    }

    /// Idempotent on `idempotency_key`: a retry with the same key
    /// returns the job created by the first call rather than charging
    /// credits twice.
    ///
    /// Check order matters: concurrency limit, then credit balance, then
    /// the account intersection, so a user who fails more than one check
    /// always sees the earlier one (`insufficient_credits` beats
    /// `no_eligible_accounts`).
    pub async fn submit(&self, request: SubmitJobRequest) -> Result<Job> {
        let distinct_urls = request.distinct_urls();
        request.validate(&distinct_urls)?;

        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.jobs.jobs.find_by_idempotency_key(request.user_id, key).await? {
                return Ok(existing);
            }
        }

        let cost = required_credits(distinct_urls.len());
        let selected_ids = selected_account_ids(&request.configuration);

        let mut tx = self.jobs.pool().begin().await?;

        let user = lock_user_for_update_tx(&mut tx, request.user_id).await?;

        let active = self.jobs.jobs.count_active_by_user(request.user_id).await?;
        if active as i32 >= user.max_concurrent_jobs {
            return Err(Error::ConcurrentLimitExceeded);
        }

        if user.credits_balance < cost {
            return Err(Error::InsufficientCredits {
                required: cost,
                available: user.credits_balance,
            });
        }

        debit_credits_tx(&mut tx, request.user_id, cost).await?;

        let eligible = self.accounts.list_eligible(request.user_id).await?;
        let account_ids: Vec<Uuid> = if selected_ids.is_empty() {
            eligible.iter().map(|a| a.id).collect()
        } else {
            let eligible_ids: HashSet<Uuid> = eligible.iter().map(|a| a.id).collect();
            selected_ids
                .into_iter()
                .filter(|id| eligible_ids.contains(id))
                .collect()
        };
        if account_ids.is_empty() {
            return Err(Error::NoEligibleAccounts);
        }

        let job = Job::new(
            request.user_id,
            request.job_type,
            request.configuration,
            request.max_results,
            distinct_urls.len() as i32,
            cost,
            request.idempotency_key,
        );
        let url_items: Vec<UrlWorkItem> = distinct_urls
            .iter()
            .map(|url| UrlWorkItem::new(job.id, url.clone()))
            .collect();
        let priority = request.job_type.default_priority();

        create_job_tx(&mut tx, &job, &url_items, &account_ids, priority).await?;

        tx.commit().await?;

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_credits_is_at_least_one() {
        assert_eq!(required_credits(0), 1);
        assert_eq!(required_credits(1), 1);
        assert_eq!(required_credits(50), 50);
    }

    fn request(urls: Vec<&str>) -> SubmitJobRequest {
        SubmitJobRequest {
            user_id: Uuid::new_v4(),
            job_type: JobType::Profile,
            urls: urls.into_iter().map(String::from).collect(),
            max_results: 10,
            configuration: serde_json::json!({}),
            idempotency_key: None,
        }
    }

    #[test]
    fn test_validate_rejects_empty_urls() {
        let r = request(vec![]);
        assert!(r.validate(&r.distinct_urls()).is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let r = request(vec!["ftp://linkedin.com"]);
        assert!(r.validate(&r.distinct_urls()).is_err());
    }

    #[test]
    fn test_validate_rejects_disallowed_host() {
        let r = request(vec!["https://example.com/a"]);
        assert!(r.validate(&r.distinct_urls()).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        let r = request(vec!["https://www.linkedin.com/in/someone"]);
        assert!(r.validate(&r.distinct_urls()).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_max_results() {
        let mut r = request(vec!["https://www.linkedin.com/in/someone"]);
        r.max_results = 0;
        assert!(r.validate(&r.distinct_urls()).is_err());
    }

    #[test]
    fn test_distinct_urls_dedupes_preserving_first_seen_order() {
        let r = request(vec![
            "https://www.linkedin.com/in/a",
            "https://www.linkedin.com/in/b",
            "https://www.linkedin.com/in/a",
        ]);
        assert_eq!(
            r.distinct_urls(),
            vec![
                "https://www.linkedin.com/in/a".to_string(),
                "https://www.linkedin.com/in/b".to_string(),
            ]
        );
    }

    #[test]
    fn test_is_allowed_host_accepts_linkedin_and_subdomains() {
        assert!(is_allowed_host("linkedin.com"));
        assert!(is_allowed_host("www.linkedin.com"));
        assert!(is_allowed_host("de.linkedin.com"));
        assert!(!is_allowed_host("notlinkedin.com"));
        assert!(!is_allowed_host("linkedin.com.evil.example"));
    }

    #[test]
    fn test_selected_account_ids_parses_uuid_array() {
        let id = Uuid::new_v4();
        let config = serde_json::json!({ "selected_account_ids": [id.to_string()] });
        assert_eq!(selected_account_ids(&config), vec![id]);
    }

    #[test]
    fn test_selected_account_ids_defaults_empty_when_absent() {
        assert!(selected_account_ids(&serde_json::json!({})).is_empty());
    }
}
