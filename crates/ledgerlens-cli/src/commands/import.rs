//! History import commands
//!
//! Accepts the two snapshot shapes the analytics run over: transactions
//! (vendor/amount/date) and receipt line items (item/unit price/vendor).
//! CSV and JSON are both supported; the format is picked by file extension.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ledgerlens_core::models::{LineItemRecord, TransactionRecord};
use ledgerlens_core::Database;

pub fn cmd_import_transactions(db: &Database, user: &str, file: &Path) -> Result<()> {
    let records: Vec<TransactionRecord> = read_records(file)?;
    let total = records.len();
    let inserted = db.insert_transactions(user, &records)?;

    println!(
        "✅ Imported {} transactions ({} new, {} already present)",
        total,
        inserted,
        total - inserted
    );
    println!("   Next: ledgerlens detect");
    Ok(())
}

pub fn cmd_import_line_items(db: &Database, user: &str, file: &Path) -> Result<()> {
    let items: Vec<LineItemRecord> = read_records(file)?;
    let inserted = db.insert_line_items(user, &items)?;

    println!("✅ Imported {} line items", inserted);
    println!("   Next: ledgerlens memories");
    Ok(())
}

/// Read a CSV or JSON file into a list of records.
fn read_records<T: serde::de::DeserializeOwned>(file: &Path) -> Result<Vec<T>> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let mut reader = csv::Reader::from_path(file)
                .with_context(|| format!("Could not open {}", file.display()))?;
            let mut records = Vec::new();
            for (line, row) in reader.deserialize().enumerate() {
                let record: T =
                    row.with_context(|| format!("{}: bad record on line {}", file.display(), line + 2))?;
                records.push(record);
            }
            Ok(records)
        }
        Some("json") => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("{}: invalid JSON", file.display()))
        }
        _ => bail!("Unsupported file type (expected .csv or .json): {}", file.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_csv_transactions_import() {
        let db = Database::in_memory().unwrap();
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,vendor,amount,date,category_id,category_name").unwrap();
        writeln!(file, "t1,NETFLIX.COM,15.99,2024-01-05,,").unwrap();
        writeln!(file, "t2,Netflix,15.99,2024-02-05,sub,Subscriptions").unwrap();

        cmd_import_transactions(&db, "u1", file.path()).unwrap();
        let stored = db.list_transactions("u1").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].category_name.as_deref(), Some("Subscriptions"));

        // Re-import is a no-op
        cmd_import_transactions(&db, "u1", file.path()).unwrap();
        assert_eq!(db.list_transactions("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_json_line_items_import() {
        let db = Database::in_memory().unwrap();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"item_name":"Milk","vendor":"Store A","unit_price":3.5,"quantity":1.0,"unit_of_measure":null,"purchase_date":"2024-01-05"}}]"#
        )
        .unwrap();

        cmd_import_line_items(&db, "u1", file.path()).unwrap();
        assert_eq!(db.list_line_items("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let db = Database::in_memory().unwrap();
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(cmd_import_transactions(&db, "u1", file.path()).is_err());
    }
}
