use super::*;
use std::path::Path;

#[test]
fn task_id_identity_for_valid() {
    assert_eq!(sanitize_task_id("T1").unwrap().to_string(), "T1");
}

#[test]
fn task_id_rejects_invalid() {
    assert!(sanitize_task_id("nope").is_err());
}

#[test]
fn path_within_root_is_allowed() {
    let root = Path::new("/tmp/project");
    let resolved = sanitize_path("notes/todo.md", root).unwrap();
    assert_eq!(resolved, Path::new("/tmp/project/notes/todo.md"));
}

#[test]
fn path_traversal_via_relative_dotdot_is_rejected() {
    let root = Path::new("/tmp/project");
    let err = sanitize_path("../../etc/passwd", root).unwrap_err();
    assert_eq!(err.code, "E_PATH_TRAVERSAL");
}

#[test]
fn path_traversal_via_absolute_escape_is_rejected() {
    let root = Path::new("/tmp/project");
    let err = sanitize_path("/etc/passwd", root).unwrap_err();
    assert_eq!(err.code, "E_PATH_TRAVERSAL");
}

#[test]
fn path_with_null_byte_is_rejected() {
    let root = Path::new("/tmp/project");
    assert!(sanitize_path("foo\0bar", root).is_err());
}

#[test]
fn path_staying_inside_root_via_dotdot_then_back_is_allowed() {
    let root = Path::new("/tmp/project");
    let resolved = sanitize_path("a/../b.md", root).unwrap();
    assert_eq!(resolved, Path::new("/tmp/project/b.md"));
}

#[test]
fn content_strips_control_chars_but_keeps_whitespace() {
    let input = "hello\u{0007}\nworld\t!\u{009f}";
    let cleaned = sanitize_content(input, 100).unwrap();
    assert_eq!(cleaned, "hello\nworld\t!");
}

#[test]
fn content_enforces_max_len() {
    let err = sanitize_content(&"x".repeat(10), 5).unwrap_err();
    assert_eq!(err.code, "E_CONTENT_TOO_LARGE");
}

#[test]
fn enum_validation_accepts_known_value() {
    validate_enum("status", "active", &["active", "done"]).unwrap();
}

#[test]
fn enum_validation_rejects_unknown_value() {
    let err = validate_enum("status", "bogus", &["active", "done"]).unwrap_err();
    assert_eq!(err.code, "E_INVALID_ENUM");
}

#[test]
fn sanitize_params_validates_nested_task_ids() {
    let mut params = serde_json::json!({
        "taskId": "T1",
        "nested": { "taskId": "T2" },
        "items": [{ "taskId": "T3" }]
    });
    sanitize_params(&mut params, Path::new("/tmp/project")).unwrap();
}

#[test]
fn sanitize_params_rejects_bad_task_id_anywhere_in_tree() {
    let mut params = serde_json::json!({ "nested": { "taskId": "nope" } });
    let err = sanitize_params(&mut params, Path::new("/tmp/project")).unwrap_err();
    assert_eq!(err.code, "E_INVALID_TASK_ID");
}

#[test]
fn sanitize_params_resolves_file_fields_against_root() {
    let mut params = serde_json::json!({ "file": "../../etc/passwd" });
    let err = sanitize_params(&mut params, Path::new("/tmp/project")).unwrap_err();
    assert_eq!(err.code, "E_PATH_TRAVERSAL");
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sanitized_path_never_escapes_root(segments in prop::collection::vec("[a-z]{1,5}", 0..5)) {
            let root = Path::new("/tmp/project");
            let joined = segments.join("/");
            if let Ok(resolved) = sanitize_path(&joined, root) {
                prop_assert!(resolved.starts_with(root));
            }
        }

        #[test]
        fn traversal_always_rejected_or_contained(depth in 1usize..8) {
            let root = Path::new("/tmp/project");
            let traversal = vec![".."; depth].join("/") + "/escaped";
            let result = sanitize_path(&traversal, root);
            if let Ok(resolved) = result {
                prop_assert!(resolved.starts_with(root));
            }
        }
    }
}
