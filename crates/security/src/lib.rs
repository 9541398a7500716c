//! Security Layer (spec §4.5): input sanitisers and the sliding-window rate
//! limiter. Pure functions and in-memory state only — no I/O.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod rate_limit;
mod sanitize;

pub use rate_limit::{Category, RateLimitDecision, RateLimiter};
pub use sanitize::{sanitize_content, sanitize_params, sanitize_path, sanitize_task_id, validate_enum};
