//! Identifier types for the core data model.
//!
//! Three distinct ID shapes appear across the data model (spec §3):
//! - [`TaskId`]: `T<digits>`, monotonically allocated by the storage engine.
//! - [`SessionId`]: `session_<YYYYMMDD>_<HHMMSS>_<6hex>`, time-ordered and
//!   collision-resistant without a central counter.
//! - UUID-backed ids ([`AuditId`], [`BackgroundJobId`]) via [`define_uuid_id!`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CleoError;

/// Numeric part of a [`TaskId`] may not exceed this value (spec §3).
pub const TASK_ID_MAX_NUMERIC: u64 = 999_999;

/// Task identifier, `T<digits>` with the numeric part capped at
/// [`TASK_ID_MAX_NUMERIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Construct directly from an already-validated numeric part.
    ///
    /// Used by the storage engine's monotone allocator, which already knows
    /// the value is in range. External input must go through [`TaskId::parse`]
    /// (or `cleo_security::sanitize_task_id`) instead.
    pub fn from_numeric(n: u64) -> Self {
        Self(n)
    }

    pub fn numeric(&self) -> u64 {
        self.0
    }

    /// Parse and validate a task id string against `^T[0-9]+$` with the
    /// numeric part bounded by [`TASK_ID_MAX_NUMERIC`].
    pub fn parse(s: &str) -> Result<Self, CleoError> {
        let trimmed = s.trim();
        let Some(digits) = trimmed.strip_prefix('T') else {
            return Err(CleoError::invalid_task_id(s));
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CleoError::invalid_task_id(s));
        }
        let n: u64 = digits.parse().map_err(|_| CleoError::invalid_task_id(s))?;
        if n > TASK_ID_MAX_NUMERIC {
            return Err(CleoError::invalid_task_id(s));
        }
        Ok(Self(n))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = CleoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Session identifier: `session_<YYYYMMDD>_<HHMMSS>_<6hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Build a new session id from a timestamp, generating a random 6-hex
    /// suffix from a fresh UUID (no separate RNG dependency needed).
    pub fn generate(now: chrono::DateTime<chrono::Utc>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "session_{}_{}_{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            &suffix[..6],
        ))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Define a newtype ID wrapper around [`uuid::Uuid`].
///
/// ```ignore
/// define_uuid_id! {
///     /// Doc comment.
///     pub struct AuditId;
/// }
/// ```
#[macro_export]
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn from_uuid(u: uuid::Uuid) -> Self {
                Self(u)
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_uuid_id! {
    /// Identifier for an [`crate::audit::AuditLogRow`].
    pub struct AuditId;
}

define_uuid_id! {
    /// Identifier for a [`crate::job::BackgroundJob`].
    pub struct BackgroundJobId;
}

define_uuid_id! {
    /// Identifier carried in the gateway response envelope (spec §4.7).
    pub struct RequestId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
