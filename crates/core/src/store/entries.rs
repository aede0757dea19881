//! Cached response CRUD operations.
//!
//! Provides functions for creating, reading, expiring and searching cached
//! responses. Rows are unique on `(url, method)`.

use std::collections::BTreeMap;

use super::connection::Store;
use crate::Error;
use crate::transport::HttpResponse;
use bytes::Bytes;
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

/// A cached response row.
///
/// Note that the key ignores the request body, so two POSTs with different
/// payloads to the same URL share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub url: String,
    pub method: String,
    #[serde(skip)]
    pub body: Bytes,
    pub status_code: u16,
    /// Header name to comma-joined values.
    pub headers: BTreeMap<String, String>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds. `created_at` plus the TTL in force at write time.
    pub expires_at: i64,
    pub hit_count: u64,
}

impl CacheEntry {
    /// Build a fresh entry from a transport response.
    pub fn from_response(url: &str, method: &str, response: &HttpResponse, now: i64, ttl_seconds: i64) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            body: response.body.clone(),
            status_code: response.status,
            headers: join_headers(&response.headers),
            created_at: now,
            expires_at: now.saturating_add(ttl_seconds),
            hit_count: 0,
        }
    }

    /// Fresh entries satisfy `now < expires_at`; equality is expired.
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<(Self, String)> {
        let body: Vec<u8> = row.get(2)?;
        let hits: i64 = row.get(7)?;
        let entry = Self {
            url: row.get(0)?,
            method: row.get(1)?,
            body: Bytes::from(body),
            status_code: row.get(3)?,
            headers: BTreeMap::new(),
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
            hit_count: hits.max(0) as u64,
        };
        Ok((entry, row.get(4)?))
    }
}

/// One row of a wildcard URL search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub status_code: u16,
}

/// Collapse a header multimap into name -> comma-joined values.
///
/// Names are lowercased so that differently-cased repeats merge.
pub fn join_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    let mut joined: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        joined
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.clone());
    }
    joined
}

impl Store {
    /// Get the entry for `(url, method)`, fresh or not.
    pub fn get_entry(&self, url: &str, method: &str) -> Result<Option<CacheEntry>, Error> {
        let row = self
            .conn
            .query_row(
                "SELECT url, method, response, status_code, headers, created_at, expires_at, hits
                FROM cache WHERE url = ?1 AND method = ?2",
                params![url, method],
                CacheEntry::from_row,
            )
            .optional()?;

        match row {
            Some((mut entry, headers_json)) => {
                entry.headers = serde_json::from_str(&headers_json)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the entry for its `(url, method)`.
    ///
    /// The stored hit count always restarts at zero, whatever `entry.hit_count` says.
    pub fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let headers_json = serde_json::to_string(&entry.headers)?;
        self.conn.execute(
            "INSERT INTO cache (url, method, response, status_code, headers, created_at, expires_at, hits)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
            ON CONFLICT(url, method) DO UPDATE SET
                response = excluded.response,
                status_code = excluded.status_code,
                headers = excluded.headers,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at,
                hits = 0",
            params![
                &entry.url,
                &entry.method,
                &entry.body[..],
                entry.status_code,
                headers_json,
                entry.created_at,
                entry.expires_at,
            ],
        )?;
        Ok(())
    }

    /// Add one to the entry's hit count.
    pub fn increment_hits(&self, url: &str, method: &str) -> Result<(), Error> {
        self.conn.execute(
            "UPDATE cache SET hits = hits + 1 WHERE url = ?1 AND method = ?2",
            params![url, method],
        )?;
        Ok(())
    }

    /// Delete every entry and reset the counters, atomically.
    ///
    /// Returns the number of deleted entries.
    pub fn delete_all(&self) -> Result<u64, Error> {
        let tx = self.conn.unchecked_transaction()?;
        let count = tx.execute("DELETE FROM cache", [])?;
        tx.execute("UPDATE stats SET hits = 0, misses = 0 WHERE id = 1", [])?;
        tx.commit()?;
        Ok(count as u64)
    }

    /// Delete entries with `expires_at <= now`.
    ///
    /// Returns the number of deleted entries.
    pub fn delete_expired(&self, now: i64) -> Result<u64, Error> {
        let count = self.conn.execute("DELETE FROM cache WHERE expires_at <= ?1", params![now])?;
        Ok(count as u64)
    }

    /// Distinct URLs across all methods, sorted.
    pub fn list_distinct_urls(&self) -> Result<Vec<String>, Error> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT url FROM cache ORDER BY url")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    /// Wildcard URL search: `%` matches any run, `_` any single character.
    pub fn search_by_pattern(&self, pattern: &str) -> Result<Vec<SearchHit>, Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, status_code FROM cache WHERE url LIKE ?1 ORDER BY url, method")?;
        let hits = stmt
            .query_map(params![pattern], |row| Ok(SearchHit { url: row.get(0)?, status_code: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<u64, Error> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
