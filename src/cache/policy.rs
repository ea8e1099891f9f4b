//! Role-based expiry policy and the clock it is evaluated against.

use chrono::{Duration, Utc};

use crate::role::Role;

/// Time-to-live for entries read under `role`.
///
/// Students get 60 minutes; wardens, admins and canteen managers get 30.
/// An absent or unrecognized role falls back to the 30 minute window.
pub fn ttl_for_role(role: Option<Role>) -> Duration {
  match role {
    Some(Role::Student) => Duration::minutes(60),
    _ => Duration::minutes(30),
  }
}

/// Whether an entry written at `timestamp_ms` is still fresh at `now_ms`.
///
/// Pure and total: any pair of timestamps produces a boolean. An entry is
/// stale exactly when its age reaches the role's TTL.
pub fn is_fresh(now_ms: i64, timestamp_ms: i64, role: Option<Role>) -> bool {
  now_ms.saturating_sub(timestamp_ms) < ttl_for_role(role).num_milliseconds()
}

/// Source of "now" for staleness checks.
///
/// Injected into the cache so tests can pin time instead of sleeping
/// across TTL boundaries.
pub trait Clock: Send + Sync {
  /// Current time in milliseconds since the Unix epoch.
  fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}
