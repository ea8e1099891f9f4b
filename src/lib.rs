//! Role-aware local cache for the hostel management dashboards.
//!
//! The web app's dashboards (violations, attendance, complaints,
//! announcements, rooms) read through a small cache layer to avoid
//! redundant backend round-trips. This crate is that layer: a key/value
//! store behind a trait, a role-based expiry policy, and a facade whose
//! operations never fail: a broken cache means a live fetch, not an error.
//!
//! Remote fetching, sessions and rendering stay with the callers; the only
//! contract here is: read with a key and the reader's role, and on a miss
//! fetch yourself and save the result back.

pub mod cache;
pub mod config;
pub mod keys;
pub mod role;
