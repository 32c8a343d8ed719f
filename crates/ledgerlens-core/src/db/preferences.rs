//! Per-user preference storage
//!
//! Plain key/value strings with an optional expiry. The suggestion layer
//! keeps its "don't ask again" pattern set here as a JSON array.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rusqlite::params;

use super::Database;
use crate::error::Result;

/// Preference key holding the "don't ask again" rule-suggestion patterns.
const EXCLUDED_PATTERNS_KEY: &str = "suggestion_excluded_patterns";

impl Database {
    /// Set a preference, replacing any existing value.
    ///
    /// `ttl` of `None` means the value never expires.
    pub fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let expires_at = ttl.map(|d| (Utc::now() + d).format("%Y-%m-%d %H:%M:%S").to_string());
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO preferences (user_id, key, value, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
            params![user_id, key, value, expires_at],
        )?;
        Ok(())
    }

    /// Get a preference value; expired entries read as absent.
    pub fn get_preference(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.conn()?;
        let result: std::result::Result<String, _> = conn.query_row(
            r#"
            SELECT value FROM preferences
            WHERE user_id = ? AND key = ?
              AND (expires_at IS NULL OR expires_at > ?)
            "#,
            params![user_id, key, now],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a preference.
    pub fn delete_preference(&self, user_id: &str, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM preferences WHERE user_id = ? AND key = ?",
            params![user_id, key],
        )?;
        Ok(())
    }

    /// The user's "don't ask again" suggestion patterns.
    pub fn excluded_suggestion_patterns(&self, user_id: &str) -> Result<HashSet<String>> {
        match self.get_preference(user_id, EXCLUDED_PATTERNS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(HashSet::new()),
        }
    }

    /// Add a pattern to the "don't ask again" set.
    pub fn exclude_suggestion_pattern(&self, user_id: &str, pattern: &str) -> Result<()> {
        let mut patterns = self.excluded_suggestion_patterns(user_id)?;
        patterns.insert(pattern.to_string());
        let json = serde_json::to_string(&patterns)?;
        self.set_preference(user_id, EXCLUDED_PATTERNS_KEY, &json, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_preference("u1", "theme").unwrap().is_none());

        db.set_preference("u1", "theme", "dark", None).unwrap();
        assert_eq!(db.get_preference("u1", "theme").unwrap().as_deref(), Some("dark"));

        db.set_preference("u1", "theme", "light", None).unwrap();
        assert_eq!(db.get_preference("u1", "theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_expired_preference_reads_as_absent() {
        let db = Database::in_memory().unwrap();
        db.set_preference("u1", "flash", "x", Some(Duration::seconds(-5)))
            .unwrap();
        assert!(db.get_preference("u1", "flash").unwrap().is_none());

        db.set_preference("u1", "alive", "y", Some(Duration::hours(1)))
            .unwrap();
        assert!(db.get_preference("u1", "alive").unwrap().is_some());
    }

    #[test]
    fn test_delete_preference() {
        let db = Database::in_memory().unwrap();
        db.set_preference("u1", "theme", "dark", None).unwrap();
        db.delete_preference("u1", "theme").unwrap();
        assert!(db.get_preference("u1", "theme").unwrap().is_none());
    }

    #[test]
    fn test_excluded_pattern_set() {
        let db = Database::in_memory().unwrap();
        assert!(db.excluded_suggestion_patterns("u1").unwrap().is_empty());

        db.exclude_suggestion_pattern("u1", "netflix").unwrap();
        db.exclude_suggestion_pattern("u1", "hulu").unwrap();
        db.exclude_suggestion_pattern("u1", "netflix").unwrap();

        let patterns = db.excluded_suggestion_patterns("u1").unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns.contains("netflix"));

        // Scoped per user
        assert!(db.excluded_suggestion_patterns("u2").unwrap().is_empty());
    }
}
