//! Input sanitisers (spec §4.5).

use std::path::{Component, Path, PathBuf};

use cleo_core::{CleoError, TaskId};
use serde_json::Value;

/// `sanitizeTaskId`: trim, enforce `^T[0-9]+$`, reject numeric part > 999,999.
///
/// Delegates to [`TaskId::parse`], which already implements this exact
/// contract (spec §8's identity/rejection property is a property of
/// `TaskId::parse` itself).
pub fn sanitize_task_id(id: &str) -> Result<TaskId, CleoError> {
    TaskId::parse(id)
}

/// `sanitizePath(path, root)`: reject null bytes; resolve absolute or
/// relative against `root`; after normalisation, fail with
/// `E_PATH_TRAVERSAL` if the result lies outside `root`.
///
/// Normalisation is purely lexical (`Component` folding of `.`/`..`), not a
/// filesystem `canonicalize()` call — the path need not exist yet (e.g. a
/// file about to be written), and symlink resolution is out of scope here.
pub fn sanitize_path(path: &str, root: &Path) -> Result<PathBuf, CleoError> {
    if path.contains('\0') {
        return Err(CleoError::path_traversal(path));
    }

    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() { candidate.to_path_buf() } else { root.join(candidate) };

    let normalized = normalize_lexically(&joined);
    let normalized_root = normalize_lexically(root);

    if !normalized.starts_with(&normalized_root) {
        return Err(CleoError::path_traversal(path));
    }

    Ok(normalized)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `sanitizeContent(s, maxLen)`: enforce size; strip C0/C1 control
/// characters except `\n`, `\t`, `\r`.
pub fn sanitize_content(s: &str, max_len: usize) -> Result<String, CleoError> {
    let cleaned: String = s
        .chars()
        .filter(|c| {
            let code = *c as u32;
            let is_control = code < 0x20 || (0x7f..=0x9f).contains(&code);
            !is_control || matches!(c, '\n' | '\t' | '\r')
        })
        .collect();

    if cleaned.len() > max_len {
        return Err(CleoError::content_too_large("content", max_len));
    }
    Ok(cleaned)
}

/// `validateEnum(value, allowed, field)` for known sets (domains, gateways,
/// statuses, priorities).
pub fn validate_enum(field: &str, value: &str, allowed: &[&str]) -> Result<(), CleoError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CleoError::invalid_enum(field, value, allowed))
    }
}

/// `sanitizeParams(params, projectRoot)`: dispatch the above by recognised
/// field name and apply across arrays. Unrecognised fields pass through
/// unchanged — sanitisation targets known-dangerous shapes (ids, paths,
/// free text), not an allow-list of every possible param.
pub fn sanitize_params(params: &mut Value, project_root: &Path) -> Result<(), CleoError> {
    match params {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                sanitize_field(key, value, project_root)?;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_params(item, project_root)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn sanitize_field(key: &str, value: &mut Value, project_root: &Path) -> Result<(), CleoError> {
    match value {
        Value::String(s) => {
            if key.eq_ignore_ascii_case("taskId") || key.eq_ignore_ascii_case("task_id") {
                // Validated, not rewritten — a sanitised TaskId's Display form
                // equals its input.
                sanitize_task_id(s)?;
            } else if key.eq_ignore_ascii_case("file")
                || key.eq_ignore_ascii_case("path")
                || key.ends_with("Path")
            {
                let resolved = sanitize_path(s, project_root)?;
                *s = resolved.to_string_lossy().into_owned();
            } else if key.eq_ignore_ascii_case("description")
                || key.eq_ignore_ascii_case("title")
                || key.eq_ignore_ascii_case("content")
                || key.eq_ignore_ascii_case("note")
            {
                *s = sanitize_content(s, 2000)?;
            }
        }
        Value::Object(_) | Value::Array(_) => sanitize_params(value, project_root)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
