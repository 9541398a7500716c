use super::*;
use yare::parameterized;

#[parameterized(
    pending_to_active = { TaskStatus::Pending, TaskStatus::Active, true },
    active_to_pending = { TaskStatus::Active, TaskStatus::Pending, true },
    active_to_done = { TaskStatus::Active, TaskStatus::Done, true },
    active_to_blocked = { TaskStatus::Active, TaskStatus::Blocked, true },
    active_to_cancelled = { TaskStatus::Active, TaskStatus::Cancelled, true },
    blocked_to_active = { TaskStatus::Blocked, TaskStatus::Active, true },
    blocked_to_cancelled = { TaskStatus::Blocked, TaskStatus::Cancelled, true },
    done_to_pending = { TaskStatus::Done, TaskStatus::Pending, true },
    cancelled_to_pending = { TaskStatus::Cancelled, TaskStatus::Pending, true },
    anything_to_archived = { TaskStatus::Pending, TaskStatus::Archived, true },
    done_to_archived = { TaskStatus::Done, TaskStatus::Archived, true },
    same_status_is_noop = { TaskStatus::Active, TaskStatus::Active, true },
    pending_to_done_denied = { TaskStatus::Pending, TaskStatus::Done, false },
    blocked_to_done_denied = { TaskStatus::Blocked, TaskStatus::Done, false },
    done_to_active_denied = { TaskStatus::Done, TaskStatus::Active, false },
    cancelled_to_active_denied = { TaskStatus::Cancelled, TaskStatus::Active, false },
)]
fn status_transitions_follow_spec_table(from: TaskStatus, to: TaskStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn title_description_identity_rejected() {
    let err = Task::validate_title_description("same", "same").unwrap_err();
    assert_eq!(err.code, "E_VALIDATION");
}

#[test]
fn title_description_distinct_ok() {
    Task::validate_title_description("Auth", "Implement JWT").unwrap();
}

#[test]
fn title_length_enforced() {
    let too_long = "x".repeat(121);
    let err = Task::validate_title_description(&too_long, "desc").unwrap_err();
    assert_eq!(err.code, "E_CONTENT_TOO_LARGE");
}

#[test]
fn description_length_enforced() {
    let too_long = "x".repeat(2001);
    let err = Task::validate_title_description("title", &too_long).unwrap_err();
    assert_eq!(err.code, "E_CONTENT_TOO_LARGE");
}

#[test]
fn priority_weight_ordering() {
    assert!(Priority::Critical.weight() > Priority::High.weight());
    assert!(Priority::High.weight() > Priority::Medium.weight());
    assert!(Priority::Medium.weight() > Priority::Low.weight());
}

#[test]
fn enum_parse_roundtrips_display() {
    for s in TaskStatus::ALL {
        let parsed = TaskStatus::parse(s).unwrap();
        assert_eq!(parsed.to_string(), *s);
    }
    for s in Priority::ALL {
        let parsed = Priority::parse(s).unwrap();
        assert_eq!(parsed.to_string(), *s);
    }
}
