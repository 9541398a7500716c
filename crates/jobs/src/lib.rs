//! Job Manager (spec §4.6): long-running background operations (e.g.
//! `orchestrate.spawn`) tracked through the Data Accessor, with in-memory
//! cancellation tokens for cooperative abort.

mod manager;

pub use manager::{JobManager, DEFAULT_CONCURRENT_CAP, DEFAULT_RETENTION};
