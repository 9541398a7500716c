use super::*;

#[test]
fn classify_identifies_spawn() {
    assert_eq!(Category::classify(true, "orchestrate", "spawn"), Category::Spawn);
}

#[test]
fn classify_other_mutate_operations_are_mutate() {
    assert_eq!(Category::classify(true, "tasks", "add"), Category::Mutate);
    assert_eq!(Category::classify(true, "orchestrate", "cancel"), Category::Mutate);
}

#[test]
fn classify_query_gateway_is_query() {
    assert_eq!(Category::classify(false, "tasks", "list"), Category::Query);
}

#[test]
fn default_limits_match_spec() {
    let limiter = RateLimiter::new();
    assert_eq!(limiter.peek(Category::Query).limit, 100);
    assert_eq!(limiter.peek(Category::Mutate).limit, 30);
    assert_eq!(limiter.peek(Category::Spawn).limit, 10);
}

#[test]
fn with_limits_overrides_defaults() {
    let limiter = RateLimiter::with_limits(5, 2, 1);
    assert_eq!(limiter.peek(Category::Query).limit, 5);
    assert_eq!(limiter.peek(Category::Mutate).limit, 2);
    assert_eq!(limiter.peek(Category::Spawn).limit, 1);
}

#[test]
fn kth_call_allowed_iff_k_le_limit() {
    let limiter = RateLimiter::with_limits(3, 3, 3);
    for k in 1..=3 {
        let decision = limiter.check(Category::Query);
        assert!(decision.allowed, "call {k} should be allowed");
    }
    let fourth = limiter.check(Category::Query);
    assert!(!fourth.allowed);
    assert!(fourth.reset_ms > 0);
}

#[test]
fn remaining_counts_down_to_zero() {
    let limiter = RateLimiter::with_limits(2, 2, 2);
    let first = limiter.check(Category::Mutate);
    assert_eq!(first.remaining, 1);
    let second = limiter.check(Category::Mutate);
    assert_eq!(second.remaining, 0);
}

#[test]
fn peek_does_not_record() {
    let limiter = RateLimiter::with_limits(1, 1, 1);
    let peeked = limiter.peek(Category::Spawn);
    assert!(peeked.allowed);
    // peek must not have consumed the single slot.
    let checked = limiter.check(Category::Spawn);
    assert!(checked.allowed);
    let blocked = limiter.check(Category::Spawn);
    assert!(!blocked.allowed);
}

#[test]
fn categories_have_independent_buckets() {
    let limiter = RateLimiter::with_limits(1, 1, 1);
    assert!(limiter.check(Category::Query).allowed);
    assert!(limiter.check(Category::Mutate).allowed);
    assert!(limiter.check(Category::Spawn).allowed);
}

#[test]
fn reset_clears_recorded_calls() {
    let limiter = RateLimiter::with_limits(1, 1, 1);
    assert!(limiter.check(Category::Query).allowed);
    assert!(!limiter.check(Category::Query).allowed);
    limiter.reset();
    assert!(limiter.check(Category::Query).allowed);
}

#[test]
fn as_str_matches_spec_category_names() {
    assert_eq!(Category::Query.as_str(), "query");
    assert_eq!(Category::Mutate.as_str(), "mutate");
    assert_eq!(Category::Spawn.as_str(), "spawn");
}
