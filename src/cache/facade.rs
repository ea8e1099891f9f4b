//! The cache operations dashboard loaders call.

use color_eyre::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::entry::{self, CacheEntry};
use super::policy::{self, Clock, SystemClock};
use super::store::KvStore;
use crate::role::Role;

/// Reference window `info` measures `expires_in_ms` against.
///
/// Display-only figure: eviction in `get` follows the role-based policy,
/// which for students is longer than this.
const INFO_REFERENCE_TTL_MS: i64 = 30 * 60 * 1000;

/// Diagnostic view of a single key, as reported by [`LocalCache::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
  pub exists: bool,
  /// Milliseconds since the entry was written.
  pub age_ms: Option<i64>,
  /// Milliseconds until the reference window elapses, floored at zero.
  pub expires_in_ms: Option<i64>,
}

impl CacheInfo {
  fn absent() -> Self {
    Self {
      exists: false,
      age_ms: None,
      expires_in_ms: None,
    }
  }
}

/// Role-aware cache in front of a key/value store.
///
/// Every operation is total: store and codec failures are logged and read
/// as a miss, so a broken store degrades the app to live fetches instead of
/// surfacing errors. Keys are caller-owned strings; the cache knows nothing
/// about the entities behind them.
pub struct LocalCache<S: KvStore> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S: KvStore> LocalCache<S> {
  /// Create a cache over `store` using wall-clock time.
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock. Tests use this to pin "now".
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Read `key` if present and still fresh for `role`.
  ///
  /// Stale entries are removed on the spot. An entry that fails to parse is
  /// treated as absent but left in place.
  pub fn get<T: DeserializeOwned>(&self, key: &str, role: Option<Role>) -> Option<T> {
    let raw = self.raw_get(key)?;

    let entry: CacheEntry<T> = match entry::decode(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!("Ignoring unreadable cache entry at {}: {}", key, e);
        return None;
      }
    };

    if policy::is_fresh(self.clock.now_ms(), entry.timestamp, role) {
      Some(entry.data)
    } else {
      debug!("Evicting stale cache entry at {}", key);
      self.raw_remove(key);
      None
    }
  }

  /// Write `data` at `key`, unconditionally replacing any previous entry.
  pub fn save<T: Serialize>(&self, key: &str, data: &T) {
    let entry = CacheEntry {
      data,
      timestamp: self.clock.now_ms(),
    };

    match entry::encode(&entry) {
      Ok(raw) => self.raw_set(key, &raw),
      Err(e) => warn!("Failed to encode cache entry at {}: {}", key, e),
    }
  }

  /// Remove a single key. No-op if absent.
  pub fn clear(&self, key: &str) {
    self.raw_remove(key);
  }

  /// Remove every key containing `pattern` as a substring.
  ///
  /// Plain containment, not a glob: `clear_matching("violations_")` drops
  /// the whole violations family and nothing else.
  pub fn clear_matching(&self, pattern: &str) {
    for key in self.raw_keys() {
      if key.contains(pattern) {
        self.raw_remove(&key);
      }
    }
  }

  /// Inspect `key` without mutating or evicting, even if it is stale.
  ///
  /// `expires_in_ms` is measured against the fixed reference window, not
  /// the role policy `get` evicts by; use it for display only.
  pub fn info(&self, key: &str) -> CacheInfo {
    let raw = match self.raw_get(key) {
      Some(raw) => raw,
      None => return CacheInfo::absent(),
    };

    match entry::decode::<serde_json::Value>(&raw) {
      Ok(entry) => {
        let age = self.clock.now_ms().saturating_sub(entry.timestamp);
        CacheInfo {
          exists: true,
          age_ms: Some(age),
          expires_in_ms: Some((INFO_REFERENCE_TTL_MS - age).max(0)),
        }
      }
      // Raw value present but unreadable: report existence, nothing else
      Err(_) => CacheInfo {
        exists: true,
        age_ms: None,
        expires_in_ms: None,
      },
    }
  }

  /// Cache-first read: return a fresh cached value, or run `fetch`, cache
  /// its result and return it.
  ///
  /// Errors from `fetch` belong to the caller and propagate; a failed fetch
  /// leaves the cache untouched.
  pub fn get_or_fetch<T, F>(&self, key: &str, role: Option<Role>, fetch: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
  {
    if let Some(cached) = self.get(key, role) {
      return Ok(cached);
    }

    let data = fetch()?;
    self.save(key, &data);
    Ok(data)
  }

  // Store failures stop at the helpers below: logged, then read as a miss
  // or a silent no-op. Callers of the public operations never see them.

  fn raw_get(&self, key: &str) -> Option<String> {
    match self.store.get(key) {
      Ok(value) => value,
      Err(e) => {
        warn!("Cache store read failed for {}: {}", key, e);
        None
      }
    }
  }

  fn raw_set(&self, key: &str, value: &str) {
    if let Err(e) = self.store.set(key, value) {
      warn!("Cache store write failed for {}: {}", key, e);
    }
  }

  fn raw_remove(&self, key: &str) {
    if let Err(e) = self.store.remove(key) {
      warn!("Cache store remove failed for {}: {}", key, e);
    }
  }

  fn raw_keys(&self) -> Vec<String> {
    match self.store.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!("Cache store key listing failed: {}", e);
        Vec::new()
      }
    }
  }
}

impl<S: KvStore> Clone for LocalCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      clock: Arc::clone(&self.clock),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::MemoryStore;
  use color_eyre::eyre::eyre;
  use serde::Deserialize;
  use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

  const MINUTE_MS: i64 = 60_000;

  /// Clock pinned to an explicit time, advanced by hand.
  struct ManualClock(AtomicI64);

  impl ManualClock {
    fn at(ms: i64) -> Arc<Self> {
      Arc::new(Self(AtomicI64::new(ms)))
    }

    fn advance(&self, ms: i64) {
      self.0.fetch_add(ms, Ordering::SeqCst);
    }
  }

  impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
      self.0.load(Ordering::SeqCst)
    }
  }

  /// Store whose every operation fails, for degradation tests.
  struct BrokenStore;

  impl KvStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("store offline"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("store offline"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
      Err(eyre!("store offline"))
    }

    fn keys(&self) -> Result<Vec<String>> {
      Err(eyre!("store offline"))
    }
  }

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Violation {
    id: u64,
    reason: String,
  }

  fn sample_violations() -> Vec<Violation> {
    vec![
      Violation {
        id: 1,
        reason: "curfew".to_string(),
      },
      Violation {
        id: 2,
        reason: "noise".to_string(),
      },
    ]
  }

  fn cache_at(ms: i64) -> (LocalCache<MemoryStore>, Arc<ManualClock>) {
    let clock = ManualClock::at(ms);
    let cache = LocalCache::new(MemoryStore::new()).with_clock(clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_round_trip() {
    let (cache, _clock) = cache_at(0);
    let data = sample_violations();

    cache.save("violations_12", &data);
    let back: Vec<Violation> = cache.get("violations_12", Some(Role::Student)).unwrap();
    assert_eq!(back, data);
  }

  #[test]
  fn test_absent_key_is_a_miss() {
    let (cache, _clock) = cache_at(0);
    assert_eq!(
      cache.get::<Vec<Violation>>("violations_12", None),
      None
    );
  }

  #[test]
  fn test_stale_entry_evicted_on_read() {
    let (cache, clock) = cache_at(0);
    cache.save("violations_12", &sample_violations());

    clock.advance(61 * MINUTE_MS);
    assert_eq!(
      cache.get::<Vec<Violation>>("violations_12", Some(Role::Student)),
      None
    );
    // Eviction was eager: the key is gone, not just filtered
    assert!(!cache.info("violations_12").exists);
  }

  #[test]
  fn test_fresh_within_staff_window() {
    let (cache, clock) = cache_at(0);
    cache.save("rooms_3", &sample_violations());

    clock.advance(29 * MINUTE_MS);
    assert!(cache
      .get::<Vec<Violation>>("rooms_3", Some(Role::Admin))
      .is_some());
  }

  #[test]
  fn test_student_window_outlasts_staff_window() {
    let (cache, clock) = cache_at(0);
    cache.save("violations_12", &sample_violations());

    clock.advance(45 * MINUTE_MS);
    // Same entry, student TTL: still served
    assert!(cache
      .get::<Vec<Violation>>("violations_12", Some(Role::Student))
      .is_some());
  }

  #[test]
  fn test_unknown_role_uses_default_window() {
    let (cache, clock) = cache_at(0);
    cache.save("announcements_1", &sample_violations());

    clock.advance(45 * MINUTE_MS);
    assert_eq!(
      cache.get::<Vec<Violation>>("announcements_1", None),
      None
    );
  }

  #[test]
  fn test_clear_single_key() {
    let (cache, _clock) = cache_at(0);
    cache.save("violations_12", &sample_violations());

    cache.clear("violations_12");
    assert!(!cache.info("violations_12").exists);

    // Clearing an absent key is a no-op
    cache.clear("violations_12");
  }

  #[test]
  fn test_clear_matching_drops_only_the_family() {
    let (cache, _clock) = cache_at(0);
    cache.save("violations_1", &1);
    cache.save("violations_2", &2);
    cache.save("attendance_1", &3);

    cache.clear_matching("violations_");

    assert!(!cache.info("violations_1").exists);
    assert!(!cache.info("violations_2").exists);
    assert!(cache.info("attendance_1").exists);
  }

  #[test]
  fn test_corrupt_entry_reads_as_miss() {
    let (cache, _clock) = cache_at(0);
    cache.store.set("violations_12", "not json").unwrap();

    assert_eq!(
      cache.get::<Vec<Violation>>("violations_12", Some(Role::Student)),
      None
    );
    // The unreadable entry is not purged speculatively
    assert!(cache.info("violations_12").exists);
  }

  #[test]
  fn test_overwrite_replaces_value_and_timestamp() {
    let (cache, clock) = cache_at(0);
    cache.save("menu", &"monday");

    clock.advance(5 * MINUTE_MS);
    cache.save("menu", &"tuesday");

    assert_eq!(
      cache.get::<String>("menu", None).as_deref(),
      Some("tuesday")
    );

    let raw = cache.store.get("menu").unwrap().unwrap();
    let entry = entry::decode::<String>(&raw).unwrap();
    assert_eq!(entry.timestamp, 5 * MINUTE_MS);
  }

  #[test]
  fn test_info_reports_age_and_time_left() {
    let (cache, clock) = cache_at(0);
    cache.save("menu", &"monday");

    clock.advance(10 * MINUTE_MS);
    let info = cache.info("menu");
    assert!(info.exists);
    assert_eq!(info.age_ms, Some(10 * MINUTE_MS));
    assert_eq!(info.expires_in_ms, Some(20 * MINUTE_MS));
  }

  #[test]
  fn test_info_floors_time_left_at_zero() {
    let (cache, clock) = cache_at(0);
    cache.save("menu", &"monday");

    clock.advance(45 * MINUTE_MS);
    let info = cache.info("menu");
    assert!(info.exists);
    assert_eq!(info.expires_in_ms, Some(0));
    // info never evicts, even past the window
    assert!(cache.info("menu").exists);
  }

  #[test]
  fn test_broken_store_degrades_to_miss() {
    let cache = LocalCache::new(BrokenStore).with_clock(ManualClock::at(0));

    assert_eq!(cache.get::<Vec<Violation>>("violations_12", None), None);
    cache.save("violations_12", &sample_violations());
    cache.clear("violations_12");
    cache.clear_matching("violations_");
    assert!(!cache.info("violations_12").exists);
  }

  #[test]
  fn test_get_or_fetch_fetches_on_miss_only() {
    let (cache, _clock) = cache_at(0);
    let calls = AtomicU32::new(0);

    let first: Vec<Violation> = cache
      .get_or_fetch("violations_12", Some(Role::Student), || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_violations())
      })
      .unwrap();
    assert_eq!(first, sample_violations());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Fresh hit: the fetcher must not run again
    let second: Vec<Violation> = cache
      .get_or_fetch("violations_12", Some(Role::Student), || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
      })
      .unwrap();
    assert_eq!(second, sample_violations());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_get_or_fetch_refetches_after_expiry() {
    let (cache, clock) = cache_at(0);

    let _: Vec<Violation> = cache
      .get_or_fetch("violations_12", None, || Ok(sample_violations()))
      .unwrap();

    clock.advance(31 * MINUTE_MS);
    let refreshed: Vec<Violation> = cache
      .get_or_fetch("violations_12", None, || Ok(Vec::new()))
      .unwrap();
    assert!(refreshed.is_empty());
  }

  #[test]
  fn test_get_or_fetch_propagates_fetch_errors() {
    let (cache, _clock) = cache_at(0);

    let result: Result<Vec<Violation>> =
      cache.get_or_fetch("violations_12", None, || Err(eyre!("backend down")));
    assert!(result.is_err());
    // A failed fetch must not populate the cache
    assert!(!cache.info("violations_12").exists);
  }
}
