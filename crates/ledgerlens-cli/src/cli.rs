//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LedgerLens - Understand where your business spends
#[derive(Parser)]
#[command(name = "ledgerlens")]
#[command(about = "Spending analytics: subscriptions, price memory, budget alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// User the command operates on
    #[arg(long, default_value = "default", global = true)]
    pub user: String,

    /// Config file (TOML) with detector thresholds and duplicate categories
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transaction or line-item history
    Import {
        /// File to import (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the file as receipt line items instead of transactions
        #[arg(long)]
        items: bool,
    },

    /// Detect recurring charges and sync them to the store
    Detect,

    /// Manage detected subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: Option<SubscriptionsAction>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Show item or vendor price memories
    Memories {
        /// Which memories to show: items, vendors
        #[arg(default_value = "items")]
        kind: String,
    },

    /// Show the insight feed and budget alerts for this month
    Insights,

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// Confirm a detected subscription
    Confirm {
        /// Subscription ID
        id: i64,
    },

    /// Dismiss a subscription; it will not be re-created by detection
    Dismiss {
        /// Subscription ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules
    List,

    /// Add a rule
    Add {
        /// Pattern text to match
        pattern: String,

        /// Match type: exact, contains, starts_with
        #[arg(long, default_value = "contains")]
        match_type: String,

        /// Target category id
        #[arg(long)]
        category: Option<String>,

        /// Only match when the vendor contains this text
        #[arg(long)]
        vendor: Option<String>,

        /// Flag matches as business expenses
        #[arg(long)]
        business: bool,

        /// Rule priority (higher wins)
        #[arg(long, default_value = "0")]
        priority: i64,
    },

    /// Test which rule matches a piece of text
    Test {
        /// Text to match against the rule set
        text: String,

        /// Vendor context for vendor-constrained rules
        #[arg(long)]
        vendor: Option<String>,
    },
}
