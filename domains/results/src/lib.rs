//! Result Ingestor: the worker-facing surface for posting scrape
//! results, files, progress and errors back against a leased job.

pub mod api;
pub mod storage;

pub use api::{router, ResultsState};
