//! Storage Engine + Data Accessor (spec §4.1, §4.2).
//!
//! Three [`DataAccessor`] implementations — [`sqlite::SqliteAccessor`],
//! [`json::JsonAccessor`], [`dual::DualAccessor`] — are always constructed
//! through [`safe::open`], which wraps whichever engine `storage.engine`
//! selects in [`safe::SafeAccessor`]. Nothing outside this crate can build an
//! unwrapped accessor.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod accessor;
mod aggregate;
mod checkpoint;
mod dual;
mod json;
mod safe;
mod sqlite;

pub use accessor::{DataAccessor, TaskListFilter};
pub use aggregate::{ArchiveFile, SessionsFile, TaskFile};
pub use checkpoint::GitCheckpoint;
pub use dual::DualAccessor;
pub use json::JsonAccessor;
pub use safe::{open, SafeAccessor};
pub use sqlite::SqliteAccessor;

pub(crate) fn rusqlite_err(e: rusqlite::Error) -> cleo_core::CleoError {
    cleo_core::CleoError::file_error(format!("sqlite: {e}"))
}
