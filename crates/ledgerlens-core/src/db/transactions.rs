//! Transaction and line-item storage
//!
//! Imported history is the raw material the analytic functions run over.
//! Re-importing the same file is safe: transactions are keyed by their
//! external id and duplicates are ignored.

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{LineItemRecord, TransactionRecord};

impl Database {
    /// Insert transactions, ignoring ones whose id is already stored.
    /// Returns the number of new rows.
    pub fn insert_transactions(
        &self,
        user_id: &str,
        records: &[TransactionRecord],
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO transactions
                    (id, user_id, vendor, amount, date, category_id, category_name)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for record in records {
                inserted += stmt.execute(params![
                    record.id,
                    user_id,
                    record.vendor,
                    record.amount,
                    record.date.to_string(),
                    record.category_id,
                    record.category_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// All of a user's transactions, oldest first.
    pub fn list_transactions(&self, user_id: &str) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, vendor, amount, date, category_id, category_name
            FROM transactions
            WHERE user_id = ?
            ORDER BY date ASC
            "#,
        )?;

        let records = stmt
            .query_map(params![user_id], |row| {
                let date_str: String = row.get(3)?;
                Ok(TransactionRecord {
                    id: row.get(0)?,
                    vendor: row.get(1)?,
                    amount: row.get(2)?,
                    date: parse_date(&date_str),
                    category_id: row.get(4)?,
                    category_name: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Insert line items. Returns the number of rows added.
    pub fn insert_line_items(&self, user_id: &str, items: &[LineItemRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO line_items
                    (user_id, item_name, vendor, unit_price, quantity, unit_of_measure, purchase_date)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for item in items {
                stmt.execute(params![
                    user_id,
                    item.item_name,
                    item.vendor,
                    item.unit_price,
                    item.quantity,
                    item.unit_of_measure,
                    item.purchase_date.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    /// All of a user's line items, oldest first.
    pub fn list_line_items(&self, user_id: &str) -> Result<Vec<LineItemRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT item_name, vendor, unit_price, quantity, unit_of_measure, purchase_date
            FROM line_items
            WHERE user_id = ?
            ORDER BY purchase_date ASC
            "#,
        )?;

        let items = stmt
            .query_map(params![user_id], |row| {
                let date_str: String = row.get(5)?;
                Ok(LineItemRecord {
                    item_name: row.get(0)?,
                    vendor: row.get(1)?,
                    unit_price: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_of_measure: row.get(4)?,
                    purchase_date: parse_date(&date_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vendor: &str, date: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            vendor: vendor.to_string(),
            amount: 15.99,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category_id: None,
            category_name: None,
        }
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let records = vec![
            record("t1", "Netflix", "2024-01-05"),
            record("t2", "Netflix", "2024-02-05"),
        ];
        assert_eq!(db.insert_transactions("u1", &records).unwrap(), 2);
        assert_eq!(db.insert_transactions("u1", &records).unwrap(), 0);
        assert_eq!(db.list_transactions("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_list_ordered_by_date() {
        let db = Database::in_memory().unwrap();
        let records = vec![
            record("t2", "B", "2024-03-01"),
            record("t1", "A", "2024-01-01"),
        ];
        db.insert_transactions("u1", &records).unwrap();
        let listed = db.list_transactions("u1").unwrap();
        assert_eq!(listed[0].id, "t1");
        assert_eq!(listed[1].id, "t2");
    }

    #[test]
    fn test_line_items_round_trip() {
        let db = Database::in_memory().unwrap();
        let items = vec![LineItemRecord {
            item_name: "Milk".to_string(),
            vendor: "Store A".to_string(),
            unit_price: 3.50,
            quantity: 2.0,
            unit_of_measure: Some("l".to_string()),
            purchase_date: NaiveDate::parse_from_str("2024-01-05", "%Y-%m-%d").unwrap(),
        }];
        assert_eq!(db.insert_line_items("u1", &items).unwrap(), 1);

        let listed = db.list_line_items("u1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item_name, "Milk");
        assert!((listed[0].quantity - 2.0).abs() < 1e-9);
        assert!(db.list_line_items("u2").unwrap().is_empty());
    }
}
