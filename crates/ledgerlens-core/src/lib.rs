//! LedgerLens Core Library
//!
//! Shared functionality for the LedgerLens small-business spending
//! analytics tool:
//! - Vendor/item name normalization
//! - Pattern-rule matching for categorization
//! - Rule learning from user corrections
//! - Recurring-charge (subscription) detection
//! - Price and vendor memory with savings suggestions
//! - Month-end forecasting, budget alerts, and the insight feed
//! - SQLite persistence for rules, subscriptions, and preferences
//!
//! The analytic functions are pure and synchronous over in-memory
//! snapshots; all I/O lives in the `db` layer.

pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod insights;
pub mod learning;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod rules;

pub use config::LensConfig;
pub use db::{Database, NewRule};
pub use detect::{
    builtin_duplicate_categories, calculate_monthly_cost, detect_price_changes,
    find_duplicate_categories, DetectorConfig, SubscriptionDetector,
};
pub use error::{Error, Result};
pub use insights::{forecast_month, generate_alerts, generate_insights, InsightContext};
pub use learning::{build_suggestion, detect_correction, suggest_from_edit};
pub use memory::{build_item_memories, build_vendor_memories, suggestions_for_items};
pub use normalize::{normalize_item, normalize_text, normalize_vendor};
pub use rules::{match_batch, match_text, sort_rules, MatchResult};
