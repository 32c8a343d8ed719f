//! Core commands (init, detect, status) and shared utilities

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ledgerlens_core::{
    calculate_monthly_cost, find_duplicate_categories, Database, LensConfig, SubscriptionDetector,
};
use tracing::debug;

use super::truncate;

/// Resolve the database path: explicit flag, or the platform data dir.
pub fn resolve_db_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    let base = dirs::data_dir().context("Could not determine the platform data directory")?;
    let path = base.join("ledgerlens").join("ledgerlens.db");
    debug!(path = %path.display(), "Using default database path");
    Ok(path)
}

/// Open the database, creating parent directories as needed.
pub fn open_db(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let db = Database::new(&path.to_string_lossy())
        .with_context(|| format!("Could not open database at {}", path.display()))?;
    Ok(db)
}

/// Load config from the given path, or defaults when absent.
pub fn load_config(path: Option<&Path>) -> Result<LensConfig> {
    match path {
        Some(p) => {
            LensConfig::from_path(p).with_context(|| format!("Could not load {}", p.display()))
        }
        None => Ok(LensConfig::default()),
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    println!("✅ Database initialized at {}", db.path());
    println!("   Next: ledgerlens import --file transactions.csv");
    Ok(())
}

pub fn cmd_detect(db: &Database, user: &str, config: &LensConfig) -> Result<()> {
    let transactions = db.list_transactions(user)?;
    if transactions.is_empty() {
        println!("No transactions imported yet. Run:");
        println!("  ledgerlens import --file transactions.csv");
        return Ok(());
    }

    let detector = SubscriptionDetector::with_config(config.detector.clone());
    let detected = detector.detect(&transactions);
    let synced = db.sync_detections(user, &detected)?;

    // Record price changes against the stored rows
    let stored = db.list_subscriptions(user)?;
    for sub in &detected {
        let Some(row) = stored
            .iter()
            .find(|s| s.vendor_normalized == sub.vendor_normalized)
        else {
            continue;
        };
        for change in detector.detect_price_changes(sub) {
            db.insert_price_change(row.id, &change)?;
        }
    }

    println!();
    println!("🔁 Recurring charges ({} detected, {} synced)", detected.len(), synced);
    println!("   ─────────────────────────────────────────────────────────────");
    for sub in &detected {
        println!(
            "   {:20} │ {:>8} │ {:9} │ conf {:.2} │ next {}",
            truncate(&sub.vendor_display, 20),
            format!("${:.2}", sub.avg_amount),
            sub.frequency.as_str(),
            sub.confidence,
            sub.next_expected,
        );
    }

    let duplicates = find_duplicate_categories(&detected, &config.duplicate_categories);
    if !duplicates.is_empty() {
        println!();
        println!("⚠️  Overlapping subscriptions");
        for group in &duplicates {
            println!(
                "   {}: {} (${:.2}/month combined)",
                group.category,
                group.vendors.join(", "),
                group.monthly_cost
            );
        }
    }

    let monthly_total: f64 = detected
        .iter()
        .map(|s| calculate_monthly_cost(s.avg_amount, s.frequency))
        .sum();
    println!();
    println!("   Estimated recurring spend: ${:.2}/month", monthly_total);

    Ok(())
}

pub fn cmd_status(db: &Database, user: &str) -> Result<()> {
    let transactions = db.list_transactions(user)?.len();
    let line_items = db.list_line_items(user)?.len();
    let subscriptions = db.list_subscriptions(user)?.len();
    let rules = db.list_rules(user)?.len();

    println!();
    println!("📊 LedgerLens status");
    println!("   Database:      {}", db.path());
    println!("   User:          {}", user);
    println!("   Transactions:  {}", transactions);
    println!("   Line items:    {}", line_items);
    println!("   Subscriptions: {}", subscriptions);
    println!("   Rules:         {}", rules);

    Ok(())
}
