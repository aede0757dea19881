//! Request cache engine.
//!
//! [`RequestCache`] decides, per request, whether to answer from the store or
//! go to the network, and whether to write the result back. It owns no
//! session data: every operation takes a [`SessionHandle`], the guarded state
//! shared by all callers of one cache session.
//!
//! ### Locking
//! - One mutex per session guards the store, cookie jar, settings and toggle.
//! - A request takes the lock twice: once for lookup and counters, once for
//!   cookie ingestion and write-back. The transport call runs between the two,
//!   unlocked.
//! - Concurrent misses on one key each fetch; nothing is coalesced.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::cookies::CookieJar;
use crate::query::merge_query;
use crate::settings::CacheSettings;
use crate::store::{CacheEntry, CacheStats, SearchHit, Store};
use crate::transport::{HttpRequest, Transport};

/// State guarded by the session lock.
#[derive(Debug)]
pub struct SessionState {
    pub store: Store,
    pub cookies: CookieJar,
    pub settings: CacheSettings,
    /// Master switch, independent of `settings`.
    pub cache_enabled: bool,
}

/// Shared, lock-guarded session state. Clones refer to the same lock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    /// Wrap a store. Caching starts enabled with an empty cookie jar.
    pub fn new(store: Store, settings: CacheSettings) -> Self {
        let state = SessionState { store, cookies: CookieJar::new(), settings, cache_enabled: true };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    /// Acquire the session lock.
    pub fn lock(&self) -> Result<MutexGuard<'_, SessionState>, Error> {
        self.inner.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Acquire the lock even if a previous holder panicked.
    pub(crate) fn lock_recovering(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether both handles guard the same state.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Outcome of the lookup critical section.
enum Lookup {
    Hit(Bytes),
    Fetch { try_cache: bool, stale: Option<Bytes>, stale_if_error: bool, cookie_header: String },
}

/// Cache-aside engine over a pluggable transport.
pub struct RequestCache<T> {
    transport: T,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> RequestCache<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, clock: Arc::new(SystemClock) }
    }

    /// Replace the time source used for expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Perform a request through the cache and return the response body.
    ///
    /// Status and headers of a cached response are available through
    /// [`RequestCache::get_entry`].
    pub fn request(
        &self, session: &SessionHandle, method: &str, url: &str, body: Option<Bytes>, headers: &[(String, String)],
    ) -> Result<Bytes, Error> {
        let (try_cache, stale, stale_if_error, cookie_header) = match self.lookup(session, method, url)? {
            Lookup::Hit(body) => return Ok(body),
            Lookup::Fetch { try_cache, stale, stale_if_error, cookie_header } => {
                (try_cache, stale, stale_if_error, cookie_header)
            }
        };

        let mut request =
            HttpRequest { method: method.to_string(), url: url.to_string(), headers: headers.to_vec(), body };
        if !cookie_header.is_empty() && request.header("cookie").is_none() {
            request.headers.push(("Cookie".to_string(), cookie_header));
        }

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(err) => {
                return match stale {
                    Some(body) if stale_if_error => {
                        warn!(%method, %url, error = %err, "fetch failed, serving stale response");
                        Ok(body)
                    }
                    _ => Err(err.into()),
                };
            }
        };

        let mut state = session.lock()?;
        let SessionState { store, cookies, settings, .. } = &mut *state;

        cookies.extract_from_response(store, response.header_values("set-cookie"))?;

        if try_cache && settings.is_cacheable_status(response.status) {
            let now = self.clock.now();
            let entry = CacheEntry::from_response(url, method, &response, now, settings.expire_after_seconds);
            store.put_entry(&entry)?;
            debug!(%method, %url, status = response.status, expires_at = entry.expires_at, "cached response");
        } else if try_cache {
            debug!(%method, %url, status = response.status, "status not cacheable");
        }

        Ok(response.body)
    }

    fn lookup(&self, session: &SessionHandle, method: &str, url: &str) -> Result<Lookup, Error> {
        let state = session.lock()?;
        let try_cache = state.cache_enabled && state.settings.permits(method, url);
        let mut stale = None;

        if try_cache {
            let now = self.clock.now();
            match state.store.get_entry(url, method)? {
                Some(entry) if entry.is_fresh(now) => {
                    state.store.increment_hits(url, method)?;
                    state.store.increment_hit()?;
                    debug!(%method, %url, "cache hit");
                    return Ok(Lookup::Hit(entry.body));
                }
                Some(entry) => {
                    state.store.increment_miss()?;
                    debug!(%method, %url, expired_at = entry.expires_at, "cache stale");
                    stale = Some(entry.body);
                }
                None => {
                    state.store.increment_miss()?;
                    debug!(%method, %url, "cache miss");
                }
            }
        }

        Ok(Lookup::Fetch {
            try_cache,
            stale,
            stale_if_error: state.settings.stale_if_error,
            cookie_header: state.cookies.format_header(),
        })
    }

    /// GET with `query` merged into the URL's query string; caller keys win.
    pub fn get(&self, session: &SessionHandle, url: &str, query: &[(&str, &str)]) -> Result<Bytes, Error> {
        let url = merge_query(url, query)?;
        self.request(session, "GET", &url, None, &[])
    }

    /// POST. The cache key ignores `body`.
    pub fn post(&self, session: &SessionHandle, url: &str, body: Option<Bytes>) -> Result<Bytes, Error> {
        self.request(session, "POST", url, body, &[])
    }

    pub fn head(&self, session: &SessionHandle, url: &str) -> Result<Bytes, Error> {
        self.request(session, "HEAD", url, None, &[])
    }

    pub fn list_cached_urls(&self, session: &SessionHandle) -> Result<Vec<String>, Error> {
        session.lock()?.store.list_distinct_urls()
    }

    pub fn get_entry(&self, session: &SessionHandle, url: &str, method: &str) -> Result<Option<CacheEntry>, Error> {
        session.lock()?.store.get_entry(url, method)
    }

    pub fn search(&self, session: &SessionHandle, pattern: &str) -> Result<Vec<SearchHit>, Error> {
        session.lock()?.store.search_by_pattern(pattern)
    }

    pub fn size(&self, session: &SessionHandle) -> Result<u64, Error> {
        session.lock()?.store.count()
    }

    /// Delete all entries and zero the counters, returning how many went.
    pub fn clear_cache(&self, session: &SessionHandle) -> Result<u64, Error> {
        let deleted = session.lock()?.store.delete_all()?;
        debug!(deleted, "cleared cache");
        Ok(deleted)
    }

    /// Delete entries with `expires_at <= now`, returning how many went.
    pub fn clear_expired(&self, session: &SessionHandle) -> Result<u64, Error> {
        let state = session.lock()?;
        let deleted = state.store.delete_expired(self.clock.now())?;
        debug!(deleted, "cleared expired entries");
        Ok(deleted)
    }

    pub fn stats(&self, session: &SessionHandle) -> Result<CacheStats, Error> {
        session.lock()?.store.stats()
    }

    /// Reload the cookie jar from the store, dropping memory-only cookies.
    pub fn load_cookies(&self, session: &SessionHandle) -> Result<(), Error> {
        let mut state = session.lock()?;
        let SessionState { store, cookies, .. } = &mut *state;
        cookies.load(store, self.clock.now())
    }

    pub fn set_cookie(&self, session: &SessionHandle, name: &str, value: &str) -> Result<(), Error> {
        let mut state = session.lock()?;
        let SessionState { store, cookies, .. } = &mut *state;
        cookies.set(store, name, value)
    }

    pub fn get_cookie(&self, session: &SessionHandle, name: &str) -> Result<Option<String>, Error> {
        Ok(session.lock()?.cookies.get(name).map(str::to_string))
    }

    pub fn clear_cookies(&self, session: &SessionHandle) -> Result<(), Error> {
        let mut state = session.lock()?;
        let SessionState { store, cookies, .. } = &mut *state;
        cookies.clear(store)
    }

    pub fn cookie_header(&self, session: &SessionHandle) -> Result<String, Error> {
        Ok(session.lock()?.cookies.format_header())
    }

    pub fn settings(&self, session: &SessionHandle) -> Result<CacheSettings, Error> {
        Ok(session.lock()?.settings.clone())
    }

    /// Mutate the settings in place under the lock.
    pub fn update_settings<R>(
        &self, session: &SessionHandle, update: impl FnOnce(&mut CacheSettings) -> R,
    ) -> Result<R, Error> {
        Ok(update(&mut session.lock()?.settings))
    }

    pub fn cache_enabled(&self, session: &SessionHandle) -> Result<bool, Error> {
        Ok(session.lock()?.cache_enabled)
    }

    /// Set the master switch, returning its previous value.
    pub fn set_cache_enabled(&self, session: &SessionHandle, enabled: bool) -> Result<bool, Error> {
        let mut state = session.lock()?;
        Ok(std::mem::replace(&mut state.cache_enabled, enabled))
    }
}
