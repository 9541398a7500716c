//! Sliding-window rate limiter keyed by gateway category (spec §4.5).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Category derived from `(gateway, domain, operation)`. Only the three
/// buckets named in spec §4.5 carry a distinct limit; everything else that
/// isn't `spawn` falls under its gateway's bucket (`query` or `mutate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Query,
    Mutate,
    Spawn,
}

impl Category {
    /// Classify a call by gateway + domain.operation (spec §4.5: "spawn
    /// (orchestrate.spawn)").
    pub fn classify(gateway_is_mutate: bool, domain: &str, operation: &str) -> Self {
        if domain == "orchestrate" && operation == "spawn" {
            Category::Spawn
        } else if gateway_is_mutate {
            Category::Mutate
        } else {
            Category::Query
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Query => "query",
            Category::Mutate => "mutate",
            Category::Spawn => "spawn",
        }
    }

    fn default_limit(self) -> u32 {
        match self {
            Category::Query => 100,
            Category::Mutate => 30,
            Category::Spawn => 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// Milliseconds until the oldest retained timestamp falls out of the
    /// window (0 when not at capacity).
    pub reset_ms: u64,
    pub category: Category,
}

const WINDOW: Duration = Duration::from_secs(60);

struct Bucket {
    timestamps: VecDeque<Instant>,
    limit: u32,
}

/// Per-process sliding-window limiter (spec §5: "Rate-limit state is
/// per-process ... by design").
pub struct RateLimiter {
    buckets: Mutex<HashMap<Category, Bucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(HashMap::new()) }
    }

    /// Build a limiter with limits overridden from config
    /// (`rateLimiting.{query,mutate,spawn}`, spec §6).
    pub fn with_limits(query: u32, mutate: u32, spawn: u32) -> Self {
        let limiter = Self::new();
        {
            let mut buckets = limiter.buckets.lock();
            buckets.insert(Category::Query, Bucket { timestamps: VecDeque::new(), limit: query });
            buckets.insert(Category::Mutate, Bucket { timestamps: VecDeque::new(), limit: mutate });
            buckets.insert(Category::Spawn, Bucket { timestamps: VecDeque::new(), limit: spawn });
        }
        limiter
    }

    fn prune(bucket: &mut Bucket, now: Instant) {
        while let Some(front) = bucket.timestamps.front() {
            if now.duration_since(*front) >= WINDOW {
                bucket.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn reset_ms(bucket: &Bucket, now: Instant) -> u64 {
        match bucket.timestamps.front() {
            Some(oldest) => {
                let elapsed = now.duration_since(*oldest);
                WINDOW.saturating_sub(elapsed).as_millis() as u64
            }
            None => 0,
        }
    }

    /// `check`: prunes expired timestamps, admits if the retained count is
    /// under the limit, and records the call if admitted.
    pub fn check(&self, category: Category) -> RateLimitDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(category)
            .or_insert_with(|| Bucket { timestamps: VecDeque::new(), limit: category.default_limit() });

        Self::prune(bucket, now);
        let limit = bucket.limit;
        let count = bucket.timestamps.len() as u32;

        if count < limit {
            bucket.timestamps.push_back(now);
            RateLimitDecision {
                allowed: true,
                remaining: limit - count - 1,
                limit,
                reset_ms: Self::reset_ms(bucket, now),
                category,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                limit,
                reset_ms: Self::reset_ms(bucket, now),
                category,
            }
        }
    }

    /// `peek`: reports the current admission state without recording a call.
    pub fn peek(&self, category: Category) -> RateLimitDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(category)
            .or_insert_with(|| Bucket { timestamps: VecDeque::new(), limit: category.default_limit() });

        Self::prune(bucket, now);
        let limit = bucket.limit;
        let count = bucket.timestamps.len() as u32;
        RateLimitDecision {
            allowed: count < limit,
            remaining: limit.saturating_sub(count),
            limit,
            reset_ms: Self::reset_ms(bucket, now),
            category,
        }
    }

    /// Test-only: clear all recorded timestamps (spec §4.5: "`reset` is
    /// test-only").
    #[cfg(any(test, feature = "test-support"))]
    pub fn reset(&self) {
        self.buckets.lock().clear();
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
