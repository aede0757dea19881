//! Self-locking cache session.
//!
//! [`CachedSession`] bundles a [`RequestCache`] with a privately owned
//! [`SessionHandle`] so single-owner callers never see the lock. Every method
//! goes through that one handle, so a read can never race a concurrent
//! `clear_cache` on the same session.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::Error;
use crate::clock::Clock;
use crate::engine::{RequestCache, SessionHandle};
use crate::settings::CacheSettings;
use crate::store::{CacheEntry, CacheStats, SearchHit, Store};
use crate::transport::Transport;

/// Restores the captured `cache_enabled` value when dropped.
struct EnabledGuard<'a> {
    session: &'a SessionHandle,
    previous: bool,
}

impl Drop for EnabledGuard<'_> {
    fn drop(&mut self) {
        self.session.lock_recovering().cache_enabled = self.previous;
    }
}

/// A cache session that locks for you.
pub struct CachedSession<T> {
    engine: RequestCache<T>,
    session: SessionHandle,
}

impl<T: Transport> CachedSession<T> {
    /// Open (or create) the store at `path` and load its cookies.
    pub fn open(path: impl AsRef<Path>, settings: CacheSettings, transport: T) -> Result<Self, Error> {
        Self::new(RequestCache::new(transport), Store::open(path)?, settings)
    }

    /// In-memory session, mostly for tests.
    pub fn open_in_memory(settings: CacheSettings, transport: T) -> Result<Self, Error> {
        Self::new(RequestCache::new(transport), Store::open_in_memory()?, settings)
    }

    /// Assemble a session from an engine and an opened store.
    ///
    /// The cookie jar is loaded eagerly.
    pub fn new(engine: RequestCache<T>, store: Store, settings: CacheSettings) -> Result<Self, Error> {
        let session = SessionHandle::new(store, settings);
        engine.load_cookies(&session)?;
        Ok(Self { engine, session })
    }

    /// Swap the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.engine = self.engine.with_clock(clock);
        self
    }

    pub fn engine(&self) -> &RequestCache<T> {
        &self.engine
    }

    pub fn request(
        &self, method: &str, url: &str, body: Option<Bytes>, headers: &[(String, String)],
    ) -> Result<Bytes, Error> {
        self.engine.request(&self.session, method, url, body, headers)
    }

    pub fn get(&self, url: &str) -> Result<Bytes, Error> {
        self.engine.get(&self.session, url, &[])
    }

    pub fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Bytes, Error> {
        self.engine.get(&self.session, url, query)
    }

    pub fn post(&self, url: &str, body: Option<Bytes>) -> Result<Bytes, Error> {
        self.engine.post(&self.session, url, body)
    }

    pub fn head(&self, url: &str) -> Result<Bytes, Error> {
        self.engine.head(&self.session, url)
    }

    pub fn list_cached_urls(&self) -> Result<Vec<String>, Error> {
        self.engine.list_cached_urls(&self.session)
    }

    /// The cached GET entry for `url`.
    pub fn get_entry(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        self.engine.get_entry(&self.session, url, "GET")
    }

    pub fn get_entry_for(&self, url: &str, method: &str) -> Result<Option<CacheEntry>, Error> {
        self.engine.get_entry(&self.session, url, method)
    }

    pub fn search(&self, pattern: &str) -> Result<Vec<SearchHit>, Error> {
        self.engine.search(&self.session, pattern)
    }

    pub fn size(&self) -> Result<u64, Error> {
        self.engine.size(&self.session)
    }

    pub fn clear_cache(&self) -> Result<u64, Error> {
        self.engine.clear_cache(&self.session)
    }

    pub fn clear_expired(&self) -> Result<u64, Error> {
        self.engine.clear_expired(&self.session)
    }

    pub fn stats(&self) -> Result<CacheStats, Error> {
        self.engine.stats(&self.session)
    }

    pub fn load_cookies(&self) -> Result<(), Error> {
        self.engine.load_cookies(&self.session)
    }

    pub fn set_cookie(&self, name: &str, value: &str) -> Result<(), Error> {
        self.engine.set_cookie(&self.session, name, value)
    }

    pub fn get_cookie(&self, name: &str) -> Result<Option<String>, Error> {
        self.engine.get_cookie(&self.session, name)
    }

    pub fn clear_cookies(&self) -> Result<(), Error> {
        self.engine.clear_cookies(&self.session)
    }

    pub fn cookie_header(&self) -> Result<String, Error> {
        self.engine.cookie_header(&self.session)
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Result<CacheSettings, Error> {
        self.engine.settings(&self.session)
    }

    pub fn update_settings<R>(&self, update: impl FnOnce(&mut CacheSettings) -> R) -> Result<R, Error> {
        self.engine.update_settings(&self.session, update)
    }

    pub fn cache_enabled(&self) -> Result<bool, Error> {
        self.engine.cache_enabled(&self.session)
    }

    pub fn set_cache_enabled(&self, enabled: bool) -> Result<(), Error> {
        self.engine.set_cache_enabled(&self.session, enabled).map(|_| ())
    }

    /// Run `block` with caching forced off, then restore the prior setting.
    pub fn with_cache_disabled<R>(&self, block: impl FnOnce(&Self) -> R) -> Result<R, Error> {
        self.with_cache_forced(false, block)
    }

    /// Run `block` with caching forced on, then restore the prior setting.
    pub fn with_cache_enabled<R>(&self, block: impl FnOnce(&Self) -> R) -> Result<R, Error> {
        self.with_cache_forced(true, block)
    }

    fn with_cache_forced<R>(&self, enabled: bool, block: impl FnOnce(&Self) -> R) -> Result<R, Error> {
        let previous = self.engine.set_cache_enabled(&self.session, enabled)?;
        let _guard = EnabledGuard { session: &self.session, previous };
        Ok(block(self))
    }
}
