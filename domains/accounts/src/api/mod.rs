pub mod handlers;
pub mod password;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AccountsState;
