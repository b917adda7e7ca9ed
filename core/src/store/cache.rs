use super::RegStore;
use crate::error::RegResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl RegStore {
    // ── Cache entries (SQLite cache backend) ──────────────────────

    /// Value stored under `key`, unless it expired at or before `now`.
    pub fn cache_entry_get(&self, key: &str, now: DateTime<Utc>) -> RegResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cache_entry WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn cache_entry_set(
        &self,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO cache_entry (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    pub fn cache_entry_delete(&self, key: &str) -> RegResult<()> {
        self.conn
            .execute("DELETE FROM cache_entry WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Drop every entry that expired at or before `now`. Returns the count.
    pub fn cache_entry_purge(&self, now: DateTime<Utc>) -> RegResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM cache_entry WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(n)
    }
}
