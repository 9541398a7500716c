use super::*;

#[test]
fn task_id_parses_valid() {
    let id = TaskId::parse("T1").unwrap();
    assert_eq!(id.numeric(), 1);
    assert_eq!(id.to_string(), "T1");
}

#[test]
fn task_id_rejects_missing_prefix() {
    assert!(TaskId::parse("1").is_err());
}

#[test]
fn task_id_rejects_non_numeric_suffix() {
    assert!(TaskId::parse("Tabc").is_err());
}

#[test]
fn task_id_rejects_over_max() {
    assert!(TaskId::parse("T1000000").is_err());
    assert!(TaskId::parse("T999999").is_ok());
}

#[test]
fn task_id_trims_whitespace() {
    assert_eq!(TaskId::parse(" T42 ").unwrap().numeric(), 42);
}

#[test]
fn task_id_roundtrips_through_json() {
    let id = TaskId::parse("T7").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"T7\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn session_id_has_expected_shape() {
    let now = chrono::DateTime::parse_from_rfc3339("2026-07-27T10:20:30Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let id = crate::id::SessionId::generate(now);
    let s = id.as_str();
    assert!(s.starts_with("session_20260727_102030_"));
    assert_eq!(s.len(), "session_20260727_102030_".len() + 6);
}

crate::define_uuid_id! {
    /// Test id type for macro verification.
    pub struct TestUuidId;
}

#[test]
fn uuid_id_generates_unique() {
    let a = TestUuidId::new();
    let b = TestUuidId::new();
    assert_ne!(a, b);
}

#[test]
fn uuid_id_display_roundtrips_parse() {
    let a = TestUuidId::new();
    let parsed = TestUuidId::parse(&a.to_string()).unwrap();
    assert_eq!(a, parsed);
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn valid_task_ids_are_identity(n in 0u64..=TASK_ID_MAX_NUMERIC) {
            let s = format!("T{n}");
            let id = TaskId::parse(&s).unwrap();
            prop_assert_eq!(id.to_string(), s);
        }

        #[test]
        fn strings_not_matching_pattern_are_rejected(s in "[a-zA-Z]{0,10}") {
            if !s.starts_with('T') || s.len() == 1 {
                prop_assert!(TaskId::parse(&s).is_err());
            }
        }
    }
}
