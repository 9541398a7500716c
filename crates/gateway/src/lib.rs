//! Gateway Router (spec §4.8): the two JSON entry points `cleo_query` /
//! `cleo_mutate` dispatch by `(domain, operation)` into the Domain
//! Operations crate, wrapping every call in rate-limiting, input
//! sanitisation, and the audited gateway-meta envelope.
//!
//! [`Router`] is the only thing outside this crate should hold — the
//! handler map, audit writer, and context plumbing are wiring it owns.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod audit;
mod bootstrap;
mod ctx;
mod handlers;
mod router;

pub use bootstrap::open_router;
pub use ctx::HandlerCtx;
pub use router::Router;
