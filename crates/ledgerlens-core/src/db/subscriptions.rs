//! Subscription sync and price-change history

use chrono::NaiveDate;
use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{
    DetectedSubscription, Frequency, PriceChange, StoredPriceChange, StoredSubscription,
};

impl Database {
    /// Upsert one detection keyed by `(user_id, vendor_normalized)`.
    ///
    /// Detection fields are refreshed; the user-owned `is_confirmed` and
    /// `is_dismissed` flags are left untouched on update. Returns the row id.
    pub fn upsert_detected(&self, user_id: &str, sub: &DetectedSubscription) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscriptions
                (user_id, vendor_normalized, vendor_display, avg_amount, frequency,
                 confidence, first_seen, last_seen, next_expected, occurrence_count, category)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, vendor_normalized) DO UPDATE SET
                vendor_display = excluded.vendor_display,
                avg_amount = excluded.avg_amount,
                frequency = excluded.frequency,
                confidence = excluded.confidence,
                first_seen = excluded.first_seen,
                last_seen = excluded.last_seen,
                next_expected = excluded.next_expected,
                occurrence_count = excluded.occurrence_count,
                category = excluded.category,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                user_id,
                sub.vendor_normalized,
                sub.vendor_display,
                sub.avg_amount,
                sub.frequency.as_str(),
                sub.confidence,
                sub.first_seen.to_string(),
                sub.last_seen.to_string(),
                sub.next_expected.to_string(),
                sub.occurrence_count as i64,
                sub.category,
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM subscriptions WHERE user_id = ? AND vendor_normalized = ?",
            params![user_id, sub.vendor_normalized],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Sync a full detection run into the store.
    ///
    /// Vendors the user has dismissed are skipped entirely, so a dismissal
    /// is never overwritten by re-detection. Returns the number of rows
    /// upserted.
    pub fn sync_detections(
        &self,
        user_id: &str,
        detections: &[DetectedSubscription],
    ) -> Result<usize> {
        let mut synced = 0;
        for sub in detections {
            if self.is_dismissed(user_id, &sub.vendor_normalized)? {
                continue;
            }
            self.upsert_detected(user_id, sub)?;
            synced += 1;
        }
        Ok(synced)
    }

    fn is_dismissed(&self, user_id: &str, vendor_normalized: &str) -> Result<bool> {
        let conn = self.conn()?;
        let result: std::result::Result<bool, _> = conn.query_row(
            "SELECT is_dismissed FROM subscriptions WHERE user_id = ? AND vendor_normalized = ?",
            params![user_id, vendor_normalized],
            |row| row.get(0),
        );
        match result {
            Ok(dismissed) => Ok(dismissed),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List a user's subscriptions, most recently charged first.
    pub fn list_subscriptions(&self, user_id: &str) -> Result<Vec<StoredSubscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, vendor_normalized, vendor_display, avg_amount, frequency,
                   confidence, first_seen, last_seen, next_expected, occurrence_count,
                   category, is_confirmed, is_dismissed, created_at, updated_at
            FROM subscriptions
            WHERE user_id = ?
            ORDER BY last_seen DESC
            "#,
        )?;

        let subs = stmt
            .query_map(params![user_id], row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subs)
    }

    /// Mark a subscription as user-confirmed.
    pub fn confirm_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE subscriptions SET is_confirmed = TRUE, is_dismissed = FALSE, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    /// Dismiss a subscription; later re-detections of this vendor are
    /// skipped by `sync_detections`.
    pub fn dismiss_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE subscriptions SET is_dismissed = TRUE, is_confirmed = FALSE, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    /// Append a price change, keyed by `(subscription_id, detected_on)`.
    ///
    /// Re-detecting the same change on the same date is a no-op; returns
    /// whether a row was actually inserted.
    pub fn insert_price_change(&self, subscription_id: i64, change: &PriceChange) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO price_changes
                (subscription_id, old_amount, new_amount, percent_change, detected_on)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                subscription_id,
                change.old_amount,
                change.new_amount,
                change.percent_change,
                change.changed_on.to_string(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Price-change history for one subscription, oldest first.
    pub fn list_price_changes(&self, subscription_id: i64) -> Result<Vec<StoredPriceChange>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, subscription_id, old_amount, new_amount, percent_change, detected_on
            FROM price_changes
            WHERE subscription_id = ?
            ORDER BY detected_on ASC
            "#,
        )?;

        let changes = stmt
            .query_map(params![subscription_id], |row| {
                let detected_str: String = row.get(5)?;
                Ok(StoredPriceChange {
                    id: row.get(0)?,
                    subscription_id: row.get(1)?,
                    old_amount: row.get(2)?,
                    new_amount: row.get(3)?,
                    percent_change: row.get(4)?,
                    detected_on: parse_date(&detected_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(changes)
    }
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSubscription> {
    let frequency_str: String = row.get(5)?;
    let first_seen_str: String = row.get(7)?;
    let last_seen_str: String = row.get(8)?;
    let next_expected_str: String = row.get(9)?;
    let created_at_str: String = row.get(14)?;
    let updated_at_str: String = row.get(15)?;

    Ok(StoredSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        vendor_normalized: row.get(2)?,
        vendor_display: row.get(3)?,
        avg_amount: row.get(4)?,
        frequency: frequency_str.parse().unwrap_or(Frequency::Irregular),
        confidence: row.get(6)?,
        first_seen: parse_date(&first_seen_str),
        last_seen: parse_date(&last_seen_str),
        next_expected: parse_date(&next_expected_str),
        occurrence_count: row.get(10)?,
        category: row.get(11)?,
        is_confirmed: row.get(12)?,
        is_dismissed: row.get(13)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(vendor: &str, amount: f64) -> DetectedSubscription {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        DetectedSubscription {
            vendor_normalized: vendor.to_lowercase(),
            vendor_display: vendor.to_string(),
            avg_amount: amount,
            min_amount: amount,
            max_amount: amount,
            frequency: Frequency::Monthly,
            confidence: 0.8,
            first_seen: date("2024-01-05"),
            last_seen: date("2024-03-05"),
            next_expected: date("2024-04-05"),
            occurrence_count: 3,
            category: Some("Subscriptions".to_string()),
            amounts: vec![amount; 3],
            dates: vec![],
            source_ids: vec![],
        }
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let db = Database::in_memory().unwrap();
        let id1 = db.upsert_detected("u1", &detection("Netflix", 15.99)).unwrap();
        let id2 = db.upsert_detected("u1", &detection("Netflix", 17.99)).unwrap();
        assert_eq!(id1, id2);

        let subs = db.list_subscriptions("u1").unwrap();
        assert_eq!(subs.len(), 1);
        assert!((subs[0].avg_amount - 17.99).abs() < 1e-9);
    }

    #[test]
    fn test_confirmation_survives_redetection() {
        let db = Database::in_memory().unwrap();
        let id = db.upsert_detected("u1", &detection("Netflix", 15.99)).unwrap();
        db.confirm_subscription(id).unwrap();

        db.upsert_detected("u1", &detection("Netflix", 17.99)).unwrap();
        let subs = db.list_subscriptions("u1").unwrap();
        assert!(subs[0].is_confirmed);
        assert!((subs[0].avg_amount - 17.99).abs() < 1e-9);
    }

    #[test]
    fn test_dismissed_vendor_skipped_by_sync() {
        let db = Database::in_memory().unwrap();
        let id = db.upsert_detected("u1", &detection("Hulu", 7.99)).unwrap();
        db.dismiss_subscription(id).unwrap();

        let synced = db
            .sync_detections("u1", &[detection("Hulu", 9.99), detection("Spotify", 10.99)])
            .unwrap();
        assert_eq!(synced, 1);

        let subs = db.list_subscriptions("u1").unwrap();
        let hulu = subs.iter().find(|s| s.vendor_normalized == "hulu").unwrap();
        assert!(hulu.is_dismissed);
        // Dismissed row keeps its old amount
        assert!((hulu.avg_amount - 7.99).abs() < 1e-9);
        assert!(subs.iter().any(|s| s.vendor_normalized == "spotify"));
    }

    #[test]
    fn test_users_are_isolated() {
        let db = Database::in_memory().unwrap();
        db.upsert_detected("u1", &detection("Netflix", 15.99)).unwrap();
        assert!(db.list_subscriptions("u2").unwrap().is_empty());
    }

    #[test]
    fn test_price_change_duplicate_tolerated() {
        let db = Database::in_memory().unwrap();
        let id = db.upsert_detected("u1", &detection("Netflix", 15.99)).unwrap();

        let change = PriceChange {
            old_amount: 15.99,
            new_amount: 17.99,
            change: 2.0,
            percent_change: 12.51,
            changed_on: NaiveDate::parse_from_str("2024-03-05", "%Y-%m-%d").unwrap(),
        };

        assert!(db.insert_price_change(id, &change).unwrap());
        assert!(!db.insert_price_change(id, &change).unwrap());

        let history = db.list_price_changes(id).unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].percent_change - 12.51).abs() < 1e-9);
    }
}
