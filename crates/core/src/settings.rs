//! Cache policy settings.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a URL may be cached. Absence means "always".
pub type UrlFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Policy applied by the engine on every request.
///
/// Fields are public and may be changed at any time through the session.
/// Nothing here is validated: a negative TTL simply produces entries that
/// are already stale when written.
#[derive(Clone)]
pub struct CacheSettings {
    /// TTL in seconds, applied when an entry is written.
    pub expire_after_seconds: i64,
    /// Request methods eligible for caching, compared exactly.
    pub allowable_methods: HashSet<String>,
    /// Response status codes eligible for write-back.
    pub allowable_status_codes: HashSet<u16>,
    /// Serve an expired body when the live fetch fails.
    pub stale_if_error: bool,
    pub url_filter: Option<UrlFilter>,
}

impl CacheSettings {
    pub const DEFAULT_EXPIRE_AFTER_SECONDS: i64 = 3600;

    pub fn new(
        expire_after_seconds: i64, allowable_methods: impl IntoIterator<Item = impl Into<String>>,
        allowable_status_codes: impl IntoIterator<Item = u16>, stale_if_error: bool,
    ) -> Self {
        Self {
            expire_after_seconds,
            allowable_methods: allowable_methods.into_iter().map(Into::into).collect(),
            allowable_status_codes: allowable_status_codes.into_iter().collect(),
            stale_if_error,
            url_filter: None,
        }
    }

    /// Replace the URL predicate.
    pub fn with_url_filter(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.url_filter = Some(Arc::new(filter));
        self
    }

    /// Whether `method` and `url` pass the policy. Ignores the session toggle.
    pub fn permits(&self, method: &str, url: &str) -> bool {
        self.allowable_methods.contains(method) && self.url_filter.as_ref().is_none_or(|filter| filter(url))
    }

    pub fn is_cacheable_status(&self, status: u16) -> bool {
        self.allowable_status_codes.contains(&status)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXPIRE_AFTER_SECONDS, ["GET", "HEAD"], [200], false)
    }
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("expire_after_seconds", &self.expire_after_seconds)
            .field("allowable_methods", &self.allowable_methods)
            .field("allowable_status_codes", &self.allowable_status_codes)
            .field("stale_if_error", &self.stale_if_error)
            .field("url_filter", &self.url_filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CacheSettings::default();
        assert_eq!(settings.expire_after_seconds, 3600);
        assert!(settings.allowable_methods.contains("GET"));
        assert!(settings.allowable_methods.contains("HEAD"));
        assert!(!settings.allowable_methods.contains("POST"));
        assert!(settings.is_cacheable_status(200));
        assert!(!settings.is_cacheable_status(404));
        assert!(!settings.stale_if_error);
        assert!(settings.url_filter.is_none());
    }

    #[test]
    fn test_permits_without_filter() {
        let settings = CacheSettings::default();
        assert!(settings.permits("GET", "https://example.com"));
        assert!(!settings.permits("POST", "https://example.com"));
        assert!(!settings.permits("get", "https://example.com"));
    }

    #[test]
    fn test_permits_with_filter() {
        let settings = CacheSettings::default().with_url_filter(|url| url.contains("/api/"));
        assert!(settings.permits("GET", "https://example.com/api/users"));
        assert!(!settings.permits("GET", "https://example.com/login"));
    }

    #[test]
    fn test_debug_hides_filter() {
        let settings = CacheSettings::default().with_url_filter(|_| true);
        let debug = format!("{settings:?}");
        assert!(debug.contains("<fn>"));
    }
}
