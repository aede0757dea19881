//! SQLite-backed store for cached responses, cookies and counters.
//!
//! This module provides the persisted side of a cache session:
//!
//! - Response entries keyed by `(url, method)` with TTL expiry
//! - A cookie table mirrored by the in-memory jar
//! - A single-row hit/miss counter table
//! - Automatic schema migrations
//!
//! The store does no locking of its own. A [`Store`] lives inside the session
//! state and is only reached through the session lock.

pub mod connection;
pub mod cookies;
pub mod entries;
pub mod migrations;
pub mod stats;

pub use crate::Error;

pub use connection::Store;
pub use entries::{CacheEntry, SearchHit};
pub use stats::{CacheStats, StatTotals};
