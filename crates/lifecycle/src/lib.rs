//! Lifecycle Engine (spec §4.4): the canonical 9-stage table plus the
//! `Pipeline` aggregate operations that enforce it. `cleo-domain`'s
//! `lifecycle` domain handlers call straight through to this crate's free
//! functions against a `&SafeAccessor`.

mod pipeline;
mod stage_def;

pub use pipeline::{add_evidence, block, progress, record_gate, skip, unblock};
pub use stage_def::{def_for, StageDef, STAGES};
