//! Account status state machine.
//!
//! `ACTIVE`/`PENDING` are the two eligible statuses; an
//! account only leaves them through a consecutive-failure threshold
//! breach or an administrative action. `BLOCKED` and `DISABLED` are
//! reached administratively, not automatically by `report_outcome` —
//! automatic temporary holds use the `cooldown_until`/`blocked_until`
//! deadline fields instead, which the eligibility predicate also checks
//! independently of `status`.

pub use scrapeq_common::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Failed,
    Blocked,
    Disabled,
}

impl AccountStatus {
    pub fn is_eligible_status(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Disabled)
    }

    pub fn valid_transitions(&self) -> &'static [AccountStatus] {
        match self {
            Self::Pending => &[Self::Active, Self::Blocked, Self::Disabled, Self::Failed],
            Self::Active => &[Self::Blocked, Self::Disabled, Self::Failed],
            Self::Blocked => &[Self::Active, Self::Disabled],
            Self::Failed => &[],
            Self::Disabled => &[],
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Pending => write!(f, "pending"),
            Self::Failed => write!(f, "failed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountEvent {
    Activate,
    ConsecutiveFailuresExceeded,
    AdminBlock,
    AdminDisable,
    AdminReactivate,
}

impl std::fmt::Display for AccountEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activate => write!(f, "activate"),
            Self::ConsecutiveFailuresExceeded => write!(f, "consecutive_failures_exceeded"),
            Self::AdminBlock => write!(f, "admin_block"),
            Self::AdminDisable => write!(f, "admin_disable"),
            Self::AdminReactivate => write!(f, "admin_reactivate"),
        }
    }
}

/// Guard context for the consecutive-failure threshold transition.
#[derive(Debug, Clone)]
pub struct AccountGuardContext {
    pub consecutive_failures: i32,
    pub max_consecutive_failures: i32,
}

impl Default for AccountGuardContext {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            max_consecutive_failures: 5,
        }
    }
}

pub struct AccountStatusMachine;

impl AccountStatusMachine {
    pub fn transition(
        current: AccountStatus,
        event: AccountEvent,
        context: Option<&AccountGuardContext>,
    ) -> Result<AccountStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (AccountStatus::Pending, AccountEvent::Activate) => AccountStatus::Active,

            (AccountStatus::Active, AccountEvent::ConsecutiveFailuresExceeded)
            | (AccountStatus::Pending, AccountEvent::ConsecutiveFailuresExceeded) => {
                if let Some(ctx) = context {
                    if ctx.consecutive_failures < ctx.max_consecutive_failures {
                        return Err(StateError::GuardFailed(format!(
                            "consecutive_failures {} below threshold {}",
                            ctx.consecutive_failures, ctx.max_consecutive_failures
                        )));
                    }
                }
                AccountStatus::Failed
            }

            (AccountStatus::Active, AccountEvent::AdminBlock)
            | (AccountStatus::Pending, AccountEvent::AdminBlock) => AccountStatus::Blocked,

            (AccountStatus::Blocked, AccountEvent::AdminReactivate) => AccountStatus::Active,

            (AccountStatus::Active, AccountEvent::AdminDisable)
            | (AccountStatus::Pending, AccountEvent::AdminDisable)
            | (AccountStatus::Blocked, AccountEvent::AdminDisable) => AccountStatus::Disabled,

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                })
            }
        };

        Ok(next)
    }

    pub fn can_transition(
        current: AccountStatus,
        event: &AccountEvent,
        context: Option<&AccountGuardContext>,
    ) -> bool {
        Self::transition(current, *event, context).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod account_status_machine {
        use super::*;

        #[test]
        fn test_pending_activates() {
            let result = AccountStatusMachine::transition(
                AccountStatus::Pending,
                AccountEvent::Activate,
                None,
            );
            assert_eq!(result, Ok(AccountStatus::Active));
        }

        #[test]
        fn test_guard_blocks_failure_transition_below_threshold() {
            let ctx = AccountGuardContext {
                consecutive_failures: 2,
                max_consecutive_failures: 5,
            };
            let result = AccountStatusMachine::transition(
                AccountStatus::Active,
                AccountEvent::ConsecutiveFailuresExceeded,
                Some(&ctx),
            );
            assert!(matches!(result, Err(StateError::GuardFailed(_))));
        }

        #[test]
        fn test_guard_allows_failure_transition_at_threshold() {
            let ctx = AccountGuardContext {
                consecutive_failures: 5,
                max_consecutive_failures: 5,
            };
            let result = AccountStatusMachine::transition(
                AccountStatus::Active,
                AccountEvent::ConsecutiveFailuresExceeded,
                Some(&ctx),
            );
            assert_eq!(result, Ok(AccountStatus::Failed));
        }

        #[test]
        fn test_blocked_can_be_reactivated() {
            let result = AccountStatusMachine::transition(
                AccountStatus::Blocked,
                AccountEvent::AdminReactivate,
                None,
            );
            assert_eq!(result, Ok(AccountStatus::Active));
        }

        #[test]
        fn test_terminal_failed_rejects_any_event() {
            let result = AccountStatusMachine::transition(
                AccountStatus::Failed,
                AccountEvent::Activate,
                None,
            );
            assert!(matches!(result, Err(StateError::TerminalState(_))));
        }

        #[test]
        fn test_terminal_disabled_rejects_any_event() {
            let result = AccountStatusMachine::transition(
                AccountStatus::Disabled,
                AccountEvent::AdminReactivate,
                None,
            );
            assert!(matches!(result, Err(StateError::TerminalState(_))));
        }

        #[test]
        fn test_invalid_transition_reported() {
            let result = AccountStatusMachine::transition(
                AccountStatus::Pending,
                AccountEvent::AdminReactivate,
                None,
            );
            assert!(matches!(result, Err(StateError::InvalidTransition { .. })));
        }

        #[test]
        fn test_is_eligible_status() {
            assert!(AccountStatus::Active.is_eligible_status());
            assert!(AccountStatus::Pending.is_eligible_status());
            assert!(!AccountStatus::Failed.is_eligible_status());
            assert!(!AccountStatus::Blocked.is_eligible_status());
            assert!(!AccountStatus::Disabled.is_eligible_status());
        }

        #[test]
        fn test_can_transition_helper() {
            assert!(AccountStatusMachine::can_transition(
                AccountStatus::Pending,
                &AccountEvent::Activate,
                None
            ));
            assert!(!AccountStatusMachine::can_transition(
                AccountStatus::Failed,
                &AccountEvent::Activate,
                None
            ));
        }
    }
}
