//! Account selection among a job's frozen assignment set.

use chrono::{DateTime, Utc};
use scrapeq_accounts::Account;
use scrapeq_jobs::AccountSelectionMode;

/// Filters `accounts` down to the currently eligible ones, orders them
/// least-recently-used first (fewest requests today, then oldest or
/// absent `last_request_at`), then picks according to `mode`:
/// `LeastRecentlyUsed` takes the head, `Rotation` takes position
/// `processed_urls mod |set|`. Returns `None` if nothing is eligible.
pub fn pick_account(
    accounts: &[Account],
    now: DateTime<Utc>,
    mode: AccountSelectionMode,
    processed_urls: i32,
) -> Option<&Account> {
    let mut eligible: Vec<&Account> = accounts.iter().filter(|a| a.is_eligible(now)).collect();
    if eligible.is_empty() {
        return None;
    }

    eligible.sort_by(|a, b| {
        a.requests_today
            .cmp(&b.requests_today)
            .then_with(|| match (a.last_request_at, b.last_request_at) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(&y),
            })
    });

    let index = match mode {
        AccountSelectionMode::Rotation => (processed_urls.max(0) as usize) % eligible.len(),
        AccountSelectionMode::LeastRecentlyUsed => 0,
    };
    Some(eligible[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapeq_accounts::AccountStatus;
    use uuid::Uuid;

    fn account(requests_today: i32, last_request_at: Option<DateTime<Utc>>) -> Account {
        Account {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_material: "c".to_string(),
            status: AccountStatus::Active,
            daily_request_limit: 100,
            requests_today,
            last_request_at,
            cooldown_until: None,
            blocked_until: None,
            consecutive_failures: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_picks_fewest_requests_today() {
        let a = account(5, None);
        let b = account(1, None);
        let picked = pick_account(&[a.clone(), b.clone()], Utc::now(), AccountSelectionMode::LeastRecentlyUsed, 0).unwrap();
        assert_eq!(picked.id, b.id);
    }

    #[test]
    fn test_ties_broken_by_oldest_last_request_at_first() {
        let now = Utc::now();
        let older = account(2, Some(now - chrono::Duration::hours(2)));
        let newer = account(2, Some(now - chrono::Duration::minutes(5)));
        let picked = pick_account(&[newer.clone(), older.clone()], now, AccountSelectionMode::LeastRecentlyUsed, 0).unwrap();
        assert_eq!(picked.id, older.id);
    }

    #[test]
    fn test_never_used_account_beats_used_one_at_same_count() {
        let never_used = account(2, None);
        let used = account(2, Some(Utc::now()));
        let picked = pick_account(&[used.clone(), never_used.clone()], Utc::now(), AccountSelectionMode::LeastRecentlyUsed, 0).unwrap();
        assert_eq!(picked.id, never_used.id);
    }

    #[test]
    fn test_ineligible_accounts_are_skipped() {
        let mut blocked = account(0, None);
        blocked.blocked_until = Some(Utc::now() + chrono::Duration::hours(1));
        let exhausted = account(100, None);
        assert!(pick_account(&[blocked, exhausted], Utc::now(), AccountSelectionMode::LeastRecentlyUsed, 0).is_none());
    }

    #[test]
    fn test_empty_set_returns_none() {
        assert!(pick_account(&[], Utc::now(), AccountSelectionMode::LeastRecentlyUsed, 0).is_none());
    }

    #[test]
    fn test_rotation_mode_cycles_through_ordered_set_by_processed_urls() {
        let now = Utc::now();
        let a = account(0, None);
        let b = account(1, None);
        let c = account(2, None);
        let set = [a.clone(), b.clone(), c.clone()];

        let picked0 = pick_account(&set, now, AccountSelectionMode::Rotation, 0).unwrap();
        assert_eq!(picked0.id, a.id);
        let picked1 = pick_account(&set, now, AccountSelectionMode::Rotation, 1).unwrap();
        assert_eq!(picked1.id, b.id);
        let picked3 = pick_account(&set, now, AccountSelectionMode::Rotation, 3).unwrap();
        assert_eq!(picked3.id, a.id);
    }
}
