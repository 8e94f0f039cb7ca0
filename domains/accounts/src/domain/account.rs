//! The Account entity: a per-user scraping identity with a daily quota
//! and a failure-driven cooldown/block schedule.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{AccountEvent, AccountGuardContext, AccountStatus, AccountStatusMachine, StateError};

/// Outcome reported by the Dispatcher/Result Ingestor after an account
/// was used to serve a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    TransientFailure,
    HardFailure,
}

const TRANSIENT_FAILURE_COOLDOWN_THRESHOLD: i32 = 3;
const COOLDOWN_MINUTES: i64 = 30;
const DEFAULT_BLOCK_MINUTES: i64 = 60;
const FAILED_STATUS_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_material: String,
    pub status: AccountStatus,
    pub daily_request_limit: i32,
    pub requests_today: i32,
    pub last_request_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub blocked_until: Option<DateTime<Utc>>,
    pub consecutive_failures: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: Uuid, session_material: impl Into<String>, daily_request_limit: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_material: session_material.into(),
            status: AccountStatus::Pending,
            daily_request_limit,
            requests_today: 0,
            last_request_at: None,
            cooldown_until: None,
            blocked_until: None,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Eligibility predicate: `status` must be one of the
    /// two eligible statuses, neither deadline has passed, and there is
    /// quota remaining for today.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status.is_eligible_status()
            && self.cooldown_until.map_or(true, |t| t <= now)
            && self.blocked_until.map_or(true, |t| t <= now)
            && self.requests_today < self.daily_request_limit
    }

    /// Re-checks eligibility and reserves one request slot. Callers must
    /// perform this under a row lock so the check-then-increment is
    /// atomic with respect to concurrent dispatchers.
    pub fn reserve_request(&mut self, now: DateTime<Utc>) -> Result<(), AccountBusy> {
        if !self.is_eligible(now) {
            return Err(AccountBusy);
        }
        self.requests_today += 1;
        self.last_request_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Applies a reported outcome: resets or grows the failure streak,
    /// sets cooldown/block deadlines, and drives the status machine to
    /// `Failed` once the streak crosses the threshold. Returns a
    /// `StateError` only in the unreachable case where the account is
    /// already terminal when a failure is reported — callers should
    /// treat that as a no-op since the account can't serve more work
    /// regardless.
    pub fn report_outcome(
        &mut self,
        kind: OutcomeKind,
        now: DateTime<Utc>,
        hard_failure_block: Option<ChronoDuration>,
    ) -> Result<(), StateError> {
        self.updated_at = now;
        match kind {
            OutcomeKind::Success => {
                self.consecutive_failures = 0;
                Ok(())
            }
            OutcomeKind::TransientFailure => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= TRANSIENT_FAILURE_COOLDOWN_THRESHOLD {
                    self.cooldown_until = Some(now + ChronoDuration::minutes(COOLDOWN_MINUTES));
                }
                Ok(())
            }
            OutcomeKind::HardFailure => {
                let duration = hard_failure_block
                    .unwrap_or_else(|| ChronoDuration::minutes(DEFAULT_BLOCK_MINUTES));
                self.blocked_until = Some(now + duration);
                self.consecutive_failures += 1;
                if self.consecutive_failures >= FAILED_STATUS_THRESHOLD && !self.status.is_terminal() {
                    let ctx = AccountGuardContext {
                        consecutive_failures: self.consecutive_failures,
                        max_consecutive_failures: FAILED_STATUS_THRESHOLD,
                    };
                    match AccountStatusMachine::transition(
                        self.status,
                        AccountEvent::ConsecutiveFailuresExceeded,
                        Some(&ctx),
                    ) {
                        Ok(next) => self.status = next,
                        Err(StateError::TerminalState(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
        }
    }

    pub fn reset_daily(&mut self) {
        self.requests_today = 0;
    }
}

/// Returned by `reserve_request` when eligibility no longer holds —
/// another dispatcher reserved the last quota slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBusy;

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        let mut a = Account::new(Uuid::new_v4(), "cookie-bundle", 10);
        a.status = AccountStatus::Active;
        a
    }

    #[test]
    fn test_new_account_is_pending_and_not_eligible() {
        let a = Account::new(Uuid::new_v4(), "c", 10);
        assert_eq!(a.status, AccountStatus::Pending);
        // PENDING is an eligible status, so a fresh account is eligible.
        assert!(a.is_eligible(Utc::now()));
    }

    #[test]
    fn test_eligibility_fails_when_quota_exhausted() {
        let mut a = account();
        a.requests_today = a.daily_request_limit;
        assert!(!a.is_eligible(Utc::now()));
    }

    #[test]
    fn test_eligibility_fails_during_cooldown() {
        let mut a = account();
        a.cooldown_until = Some(Utc::now() + ChronoDuration::minutes(10));
        assert!(!a.is_eligible(Utc::now()));
    }

    #[test]
    fn test_eligibility_restored_after_cooldown_passes() {
        let mut a = account();
        a.cooldown_until = Some(Utc::now() - ChronoDuration::minutes(1));
        assert!(a.is_eligible(Utc::now()));
    }

    #[test]
    fn test_reserve_request_increments_and_sets_last_request_at() {
        let mut a = account();
        let now = Utc::now();
        a.reserve_request(now).unwrap();
        assert_eq!(a.requests_today, 1);
        assert_eq!(a.last_request_at, Some(now));
    }

    #[test]
    fn test_reserve_request_busy_when_not_eligible() {
        let mut a = account();
        a.requests_today = a.daily_request_limit;
        let result = a.reserve_request(Utc::now());
        assert_eq!(result, Err(AccountBusy));
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let mut a = account();
        a.consecutive_failures = 2;
        a.report_outcome(OutcomeKind::Success, Utc::now(), None).unwrap();
        assert_eq!(a.consecutive_failures, 0);
    }

    #[test]
    fn test_transient_failure_sets_cooldown_at_threshold() {
        let mut a = account();
        let now = Utc::now();
        a.report_outcome(OutcomeKind::TransientFailure, now, None).unwrap();
        a.report_outcome(OutcomeKind::TransientFailure, now, None).unwrap();
        assert!(a.cooldown_until.is_none());
        a.report_outcome(OutcomeKind::TransientFailure, now, None).unwrap();
        assert_eq!(a.consecutive_failures, 3);
        assert!(a.cooldown_until.is_some());
    }

    #[test]
    fn test_hard_failure_sets_default_block_duration() {
        let mut a = account();
        let now = Utc::now();
        a.report_outcome(OutcomeKind::HardFailure, now, None).unwrap();
        let blocked_until = a.blocked_until.unwrap();
        assert!((blocked_until - now - ChronoDuration::minutes(60)).num_seconds().abs() < 2);
    }

    #[test]
    fn test_hard_failure_honors_caller_supplied_duration() {
        let mut a = account();
        let now = Utc::now();
        a.report_outcome(OutcomeKind::HardFailure, now, Some(ChronoDuration::minutes(15)))
            .unwrap();
        let blocked_until = a.blocked_until.unwrap();
        assert!((blocked_until - now - ChronoDuration::minutes(15)).num_seconds().abs() < 2);
    }

    #[test]
    fn test_hard_failure_transitions_to_failed_at_five_consecutive() {
        let mut a = account();
        let now = Utc::now();
        for _ in 0..5 {
            a.report_outcome(OutcomeKind::HardFailure, now, None).unwrap();
        }
        assert_eq!(a.consecutive_failures, 5);
        assert_eq!(a.status, AccountStatus::Failed);
        assert!(!a.is_eligible(now));
    }

    #[test]
    fn test_hard_failure_below_five_does_not_fail_status() {
        let mut a = account();
        let now = Utc::now();
        for _ in 0..4 {
            a.report_outcome(OutcomeKind::HardFailure, now, None).unwrap();
        }
        assert_eq!(a.status, AccountStatus::Active);
    }

    #[test]
    fn test_reset_daily_zeroes_requests_today() {
        let mut a = account();
        a.requests_today = 7;
        a.reset_daily();
        assert_eq!(a.requests_today, 0);
    }
}
