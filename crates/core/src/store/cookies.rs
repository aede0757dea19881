//! Persisted cookie rows.

use std::collections::HashMap;

use super::connection::Store;
use crate::Error;
use rusqlite::params;

impl Store {
    /// All cookies that have no expiry or expire after `now`.
    pub fn load_cookies(&self, now: i64) -> Result<HashMap<String, String>, Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value FROM cookies WHERE expires_at IS NULL OR expires_at > ?1")?;
        let cookies = stmt
            .query_map(params![now], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, String>, _>>()?;
        Ok(cookies)
    }

    /// Insert or replace a session cookie (no expiry).
    pub fn upsert_cookie(&self, name: &str, value: &str) -> Result<(), Error> {
        self.upsert_cookie_expiring(name, value, None)
    }

    /// Insert or replace a cookie with an optional Unix-seconds expiry.
    pub(crate) fn upsert_cookie_expiring(&self, name: &str, value: &str, expires_at: Option<i64>) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO cookies (name, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at",
            params![name, value, expires_at],
        )?;
        Ok(())
    }

    /// Delete every persisted cookie.
    pub fn delete_all_cookies(&self) -> Result<u64, Error> {
        let count = self.conn.execute("DELETE FROM cookies", [])?;
        Ok(count as u64)
    }
}
