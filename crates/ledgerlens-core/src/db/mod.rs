//! Persistence layer with connection pooling and migrations
//!
//! Organized by domain:
//! - `rules` - Pattern rule storage and match-count reinforcement
//! - `subscriptions` - Detected subscription sync and price-change history
//! - `preferences` - Per-user key/value preferences with optional TTL
//!
//! Everything the analytic core needs from storage goes through this
//! wrapper; the core functions themselves never touch a connection.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod preferences;
mod rules;
mod subscriptions;
mod transactions;

pub use rules::NewRule;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "ledgerlens_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Imported transactions (detection input)
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                vendor TEXT NOT NULL,
                amount REAL NOT NULL,
                date DATE NOT NULL,
                category_id TEXT,
                category_name TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);

            -- Imported receipt line items (price memory input)
            CREATE TABLE IF NOT EXISTS line_items (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                item_name TEXT NOT NULL,
                vendor TEXT NOT NULL,
                unit_price REAL NOT NULL,
                quantity REAL NOT NULL DEFAULT 1,
                unit_of_measure TEXT,
                purchase_date DATE NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_line_items_user ON line_items(user_id, purchase_date);

            -- Pattern rules (user-defined categorization)
            CREATE TABLE IF NOT EXISTS pattern_rules (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                pattern_text TEXT NOT NULL,
                match_type TEXT NOT NULL DEFAULT 'contains',
                vendor_pattern TEXT,
                target_category_id TEXT,
                is_business BOOLEAN NOT NULL DEFAULT FALSE,
                priority INTEGER NOT NULL DEFAULT 0,
                match_count INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_user ON pattern_rules(user_id, is_active);

            -- Detected subscriptions; user-owned flags survive re-detection
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                vendor_normalized TEXT NOT NULL,
                vendor_display TEXT NOT NULL,
                avg_amount REAL NOT NULL,
                frequency TEXT NOT NULL,
                confidence REAL NOT NULL,
                first_seen DATE NOT NULL,
                last_seen DATE NOT NULL,
                next_expected DATE NOT NULL,
                occurrence_count INTEGER NOT NULL,
                category TEXT,
                is_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
                is_dismissed BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, vendor_normalized)
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);

            -- Price changes (append-only; duplicate detections ignored)
            CREATE TABLE IF NOT EXISTS price_changes (
                id INTEGER PRIMARY KEY,
                subscription_id INTEGER NOT NULL REFERENCES subscriptions(id),
                old_amount REAL NOT NULL,
                new_amount REAL NOT NULL,
                percent_change REAL NOT NULL,
                detected_on DATE NOT NULL,
                UNIQUE(subscription_id, detected_on)
            );

            -- Per-user preferences, optionally expiring
            CREATE TABLE IF NOT EXISTS preferences (
                user_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at DATETIME,
                PRIMARY KEY (user_id, key)
            );
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}
