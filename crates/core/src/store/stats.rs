//! Hit/miss counters.

use super::connection::Store;
use crate::Error;
use serde::Serialize;

/// Persisted counter totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatTotals {
    pub hits: u64,
    pub misses: u64,
}

/// Aggregate cache statistics. `size` is the live entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
}

impl Store {
    pub fn increment_hit(&self) -> Result<(), Error> {
        self.conn.execute("UPDATE stats SET hits = hits + 1 WHERE id = 1", [])?;
        Ok(())
    }

    pub fn increment_miss(&self) -> Result<(), Error> {
        self.conn.execute("UPDATE stats SET misses = misses + 1 WHERE id = 1", [])?;
        Ok(())
    }

    pub fn stat_totals(&self) -> Result<StatTotals, Error> {
        let (hits, misses): (i64, i64) =
            self.conn
                .query_row("SELECT hits, misses FROM stats WHERE id = 1", [], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(StatTotals { hits: hits.max(0) as u64, misses: misses.max(0) as u64 })
    }

    pub fn reset_stats(&self) -> Result<(), Error> {
        self.conn.execute("UPDATE stats SET hits = 0, misses = 0 WHERE id = 1", [])?;
        Ok(())
    }

    /// Totals plus the current entry count.
    pub fn stats(&self) -> Result<CacheStats, Error> {
        let totals = self.stat_totals()?;
        Ok(CacheStats { hits: totals.hits, misses: totals.misses, size: self.count()? })
    }
}
