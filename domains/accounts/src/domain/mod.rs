pub mod account;
pub mod state;
pub mod user;

pub use account::{Account, AccountBusy, OutcomeKind};
pub use state::{AccountEvent, AccountGuardContext, AccountStatus, AccountStatusMachine, StateError};
pub use user::User;
