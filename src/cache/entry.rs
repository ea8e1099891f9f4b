//! Cache entry wire format and its JSON codec.

use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A cached value together with its write time.
///
/// `timestamp` is the write time in milliseconds since the epoch, never the
/// read time. Entries are immutable once written; a save replaces the whole
/// entry rather than merging into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  pub timestamp: i64,
}

/// Serialize an entry to the string the store holds.
///
/// Stored shape is `{"data": <json>, "timestamp": <ms>}`, with no version
/// field; a future format change surfaces as a decode failure, which the
/// facade already reads as a miss.
pub fn encode<T: Serialize>(entry: &CacheEntry<T>) -> Result<String> {
  serde_json::to_string(entry).map_err(|e| eyre!("Failed to serialize cache entry: {}", e))
}

/// Parse a stored string back into an entry.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<CacheEntry<T>> {
  serde_json::from_str(raw).map_err(|e| eyre!("Failed to parse cache entry: {}", e))
}
