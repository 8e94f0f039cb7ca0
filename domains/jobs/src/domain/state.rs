//! Job status state machine.

pub use scrapeq_common::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn valid_transitions(&self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Paused, Self::Cancelled],
            Self::Paused => &[Self::Running, Self::Cancelled],
            Self::Completed => &[],
            Self::Failed => &[],
            Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobEvent {
    FirstLease,
    Submit { is_complete: bool },
    FatalError,
    UserPause,
    UserResume,
    UserCancel,
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstLease => write!(f, "first_lease"),
            Self::Submit { is_complete: true } => write!(f, "submit_complete"),
            Self::Submit { is_complete: false } => write!(f, "submit"),
            Self::FatalError => write!(f, "fatal_error"),
            Self::UserPause => write!(f, "user_pause"),
            Self::UserResume => write!(f, "user_resume"),
            Self::UserCancel => write!(f, "user_cancel"),
        }
    }
}

pub struct JobStateMachine;

impl JobStateMachine {
    pub fn transition(current: JobStatus, event: JobEvent) -> Result<JobStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (JobStatus::Pending, JobEvent::FirstLease) => JobStatus::Running,
            (JobStatus::Pending, JobEvent::UserCancel) => JobStatus::Cancelled,

            (JobStatus::Running, JobEvent::Submit { is_complete: false }) => JobStatus::Running,
            (JobStatus::Running, JobEvent::Submit { is_complete: true }) => JobStatus::Completed,
            (JobStatus::Running, JobEvent::FatalError) => JobStatus::Failed,
            (JobStatus::Running, JobEvent::UserPause) => JobStatus::Paused,
            (JobStatus::Running, JobEvent::UserCancel) => JobStatus::Cancelled,

            (JobStatus::Paused, JobEvent::UserResume) => JobStatus::Running,
            (JobStatus::Paused, JobEvent::UserCancel) => JobStatus::Cancelled,

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

    pub fn can_transition(current: JobStatus, event: &JobEvent) -> bool {
        Self::transition(current, *event).is_ok()
    }
}
