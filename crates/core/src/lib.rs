//! Core types and shared functionality for reqcache.
//!
//! This crate provides:
//! - SQLite-backed store for responses, cookies and counters
//! - The request cache engine and its self-locking session facade
//! - Unified error types
//! - Configuration structures

pub mod clock;
pub mod config;
pub mod cookies;
pub mod engine;
pub mod error;
pub mod query;
pub mod session;
pub mod settings;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use cookies::{CookieJar, parse_set_cookie};
pub use engine::{RequestCache, SessionHandle, SessionState};
pub use error::Error;
pub use session::CachedSession;
pub use settings::{CacheSettings, UrlFilter};
pub use store::{CacheEntry, CacheStats, SearchHit, Store};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};
