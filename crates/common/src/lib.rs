//! Shared utilities, configuration, and error handling for Scrapeq.
//!
//! This crate provides common functionality used across the Scrapeq
//! application: configuration loading, the shared HTTP error type, the
//! shared state-machine error type, and a validating JSON extractor.

pub mod config;
pub mod error;
pub mod extractors;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::StateError;
