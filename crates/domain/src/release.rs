//! `release` domain (spec §4.3): version bump, changelog synthesis
//! (completed tasks grouped by release tag), tag commit record.

use std::cmp::Ordering;
use std::fmt;

use cleo_core::{CleoError, ErrorKind, Task, TaskStatus};
use cleo_storage::{DataAccessor, SafeAccessor, TaskListFilter};
use serde::Serialize;

/// A bare `major.minor.patch` version, hand-rolled since the core has no
/// other use for a full semver dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl Version {
    pub fn parse(s: &str) -> Result<Self, CleoError> {
        let parts: Vec<&str> = s.trim_start_matches('v').split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(CleoError::validation(format!("invalid version {s:?}, expected MAJOR.MINOR.PATCH")));
        };
        let parse_part = |p: &str| p.parse::<u32>().map_err(|_| CleoError::validation(format!("invalid version {s:?}")));
        Ok(Self { major: parse_part(major)?, minor: parse_part(minor)?, patch: parse_part(patch)? })
    }

    pub fn bump(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self { major: self.major + 1, minor: 0, patch: 0 },
            BumpKind::Minor => Self { major: self.major, minor: self.minor + 1, patch: 0 },
            BumpKind::Patch => Self { major: self.major, minor: self.minor, patch: self.patch + 1 },
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

/// `release.bump`: parses `current`, applies `kind`, rejects a result that
/// wouldn't be strictly greater (guards against a stale `current`).
pub fn bump(current: &str, kind: BumpKind) -> Result<Version, CleoError> {
    let parsed = Version::parse(current)?;
    let next = parsed.bump(kind);
    if next <= parsed {
        return Err(CleoError::new("E_VALIDATION", ErrorKind::InputShape, "bumped version did not increase"));
    }
    Ok(next)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub task_id: cleo_core::TaskId,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Changelog {
    pub tag: String,
    pub entries: Vec<ChangelogEntry>,
}

/// `release.changelog`: completed tasks whose `phase` equals the release
/// tag (spec §4.3: "groups completed tasks by release tag"), newest first.
pub async fn changelog(accessor: &SafeAccessor, tag: &str) -> Result<Changelog, CleoError> {
    let mut tasks: Vec<Task> = accessor
        .list_tasks(&TaskListFilter { status: Some(TaskStatus::Done), phase: Some(tag.to_string()), ..Default::default() })
        .await?;
    tasks.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    Ok(Changelog {
        tag: tag.to_string(),
        entries: tasks.into_iter().map(|t| ChangelogEntry { task_id: t.id, title: t.title }).collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub tag: String,
    pub version: Version,
    pub task_count: usize,
}

/// `release.tag`: records the tag commit metadata for a release; does not
/// itself invoke `git` (checkpointing is config-gated ambient behaviour,
/// not a domain operation).
pub async fn tag(accessor: &SafeAccessor, tag_name: &str, version: Version) -> Result<TagRecord, CleoError> {
    let log = changelog(accessor, tag_name).await?;
    Ok(TagRecord { tag: tag_name.to_string(), version, task_count: log.entries.len() })
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
