//! Account Registry: users' credit balances
//! and the per-user scraping identities ("accounts") that perform work
//! on their behalf.

pub mod api;
pub mod domain;
pub mod repository;

pub use api::{router, AccountsState};
pub use domain::{
    Account, AccountBusy, AccountEvent, AccountGuardContext, AccountStatus, AccountStatusMachine,
    OutcomeKind, User,
};
pub use repository::{AccountRepository, AccountsRepositories, UserRepository};
