//! Dispatcher: the hot loop that turns queued jobs into signed work
//! handed to scraper workers.

pub mod backoff;
#[path = "loop.rs"]
pub mod dispatch_loop;
pub mod pick;

pub use backoff::{backoff_delay, backoff_delay_std};
pub use dispatch_loop::{DispatchedWork, Dispatcher};
pub use pick::pick_account;
