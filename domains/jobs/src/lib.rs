//! Job Store, Admission Controller and Queue: job lifecycle from
//! submission through dispatch-ready.

pub mod admission;
pub mod api;
pub mod domain;
pub mod repository;

pub use admission::{AdmissionController, SubmitJobRequest};
pub use domain::{
    AccountAssignment, AccountSelectionMode, Job, JobEvent, JobStateMachine, JobStatus, JobType,
    Priority, ResultFile, ResultRow, UrlItemStatus, UrlWorkItem,
};
pub use repository::{JobRepository, JobsRepositories, QueueRepository, ResultRepository, UrlItemRepository};
pub use api::{router, JobsState};
