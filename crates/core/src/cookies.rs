//! In-memory cookie jar mirrored write-through to the store.
//!
//! The jar holds no lock of its own; it lives in the session state next to
//! the [`Store`] and every mutation takes the store by reference so the
//! persisted rows never lag behind memory.

use std::collections::HashMap;

use crate::Error;
use crate::store::Store;

/// Split a raw `Set-Cookie` header into `(name, value)`.
///
/// Only the first `;`-separated segment is considered, split on its first `=`,
/// both halves trimmed. Without an `=` the result is `("", "")`. Attributes
/// such as `Path` or `Expires` are ignored.
pub fn parse_set_cookie(header: &str) -> (String, String) {
    let first = header.split(';').next().unwrap_or_default();
    match first.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (String::new(), String::new()),
    }
}

/// Session cookies. Iteration order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole jar with what the store holds at `now`.
    pub fn load(&mut self, store: &Store, now: i64) -> Result<(), Error> {
        self.cookies = store.load_cookies(now)?;
        Ok(())
    }

    /// Persist a cookie, then set it in memory. A failed write leaves the jar untouched.
    pub fn set(&mut self, store: &Store, name: &str, value: &str) -> Result<(), Error> {
        store.upsert_cookie(name, value)?;
        self.cookies.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Empty the jar and the persisted cookie table.
    pub fn clear(&mut self, store: &Store) -> Result<(), Error> {
        store.delete_all_cookies()?;
        self.cookies.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `name=value` pairs joined with `"; "`, suitable for a `Cookie` header.
    pub fn format_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Parse and store every `Set-Cookie` value. Unnamed cookies are dropped.
    pub fn extract_from_response<'a>(
        &mut self, store: &Store, header_values: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), Error> {
        for raw in header_values {
            let (name, value) = parse_set_cookie(raw);
            if name.is_empty() {
                tracing::debug!(header = raw, "dropping unparsable set-cookie header");
                continue;
            }
            self.set(store, &name, &value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(header: &str) -> (String, String) {
        parse_set_cookie(header)
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(parsed("a=b"), ("a".into(), "b".into()));
    }

    #[test]
    fn test_parse_empty_and_novalue() {
        assert_eq!(parsed(""), (String::new(), String::new()));
        assert_eq!(parsed("novalue"), (String::new(), String::new()));
    }

    #[test]
    fn test_parse_ignores_attributes() {
        assert_eq!(parsed("k=v;Path=/"), ("k".into(), "v".into()));
        assert_eq!(parsed("id=42; Expires=Wed, 21 Oct 2015 07:28:00 GMT; HttpOnly"), ("id".into(), "42".into()));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parsed("  k  =  v  ;X"), ("k".into(), "v".into()));
    }

    #[test]
    fn test_parse_value_keeps_equals() {
        assert_eq!(parsed("a=b=c"), ("a".into(), "b=c".into()));
    }

    #[test]
    fn test_parse_attribute_only_segment() {
        assert_eq!(parsed("novalue; Path=/"), (String::new(), String::new()));
    }

    #[test]
    fn test_set_get_clear() {
        let store = Store::open_in_memory().unwrap();
        let mut jar = CookieJar::new();
        jar.set(&store, "session", "abc").unwrap();
        assert_eq!(jar.get("session"), Some("abc"));
        assert_eq!(store.load_cookies(0).unwrap().get("session").map(String::as_str), Some("abc"));

        jar.clear(&store).unwrap();
        assert!(jar.is_empty());
        assert!(store.load_cookies(0).unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_jar_unchanged() {
        let store = Store::open_in_memory().unwrap();
        let mut jar = CookieJar::new();
        jar.set(&store, "kept", "1").unwrap();
        store.conn.execute_batch("DROP TABLE cookies").unwrap();

        assert!(matches!(jar.set(&store, "lost", "2"), Err(Error::Database(_))));
        assert_eq!(jar.get("lost"), None);

        assert!(matches!(jar.clear(&store), Err(Error::Database(_))));
        assert_eq!(jar.get("kept"), Some("1"));
    }

    #[test]
    fn test_load_discards_memory_only_entries() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_cookie("persisted", "1").unwrap();

        let mut jar = CookieJar::new();
        jar.cookies.insert("memory_only".into(), "x".into());
        jar.load(&store, 0).unwrap();

        assert_eq!(jar.get("persisted"), Some("1"));
        assert_eq!(jar.get("memory_only"), None);
    }

    #[test]
    fn test_format_header() {
        let store = Store::open_in_memory().unwrap();
        let mut jar = CookieJar::new();
        assert_eq!(jar.format_header(), "");

        jar.set(&store, "a", "1").unwrap();
        jar.set(&store, "b", "2").unwrap();

        let header = jar.format_header();
        let mut parts: Vec<_> = header.split("; ").collect();
        parts.sort_unstable();
        assert_eq!(parts, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_extract_drops_unnamed() {
        let store = Store::open_in_memory().unwrap();
        let mut jar = CookieJar::new();
        jar.extract_from_response(&store, ["sid=xyz; Path=/", "garbage", "=orphan", "token=a=b"])
            .unwrap();

        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("sid"), Some("xyz"));
        assert_eq!(jar.get("token"), Some("a=b"));
        assert_eq!(store.load_cookies(0).unwrap().len(), 2);
    }
}
