pub mod entities;
pub mod state;

pub use entities::{
    AccountAssignment, AccountSelectionMode, Job, JobType, Priority, ResultFile, ResultRow,
    UrlItemStatus, UrlWorkItem,
};
pub use state::{JobEvent, JobStateMachine, JobStatus, StateError};
