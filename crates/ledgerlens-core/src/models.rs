//! Domain models for LedgerLens
//!
//! Input records come from the external accounting store as immutable
//! snapshots; everything else here is a derived value object recomputed on
//! each call. Closed enums carry `as_str`/`FromStr`/`Display` so they can be
//! stored as text and round-tripped through JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One business expense from the external store. Never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub vendor: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

/// One purchased line item. Finer-grained than a transaction: a single
/// purchase may carry many line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub item_name: String,
    pub vendor: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub unit_of_measure: Option<String>,
    pub purchase_date: NaiveDate,
}

/// How a pattern rule's text is compared against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    #[default]
    Contains,
    StartsWith,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "starts_with" | "startswith" => Ok(Self::StartsWith),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-defined categorization rule.
///
/// Rules are evaluated in `(priority DESC, match_count DESC)` order; the
/// first satisfying rule wins. `match_count` is bumped by the caller via
/// `Database::record_rule_match` after a winning match, so historically
/// successful rules win ties over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub id: i64,
    pub pattern_text: String,
    pub match_type: MatchType,
    /// When set, the rule only applies if the call supplies a vendor
    /// containing this sub-pattern (case-insensitive).
    pub vendor_pattern: Option<String>,
    pub target_category_id: Option<String>,
    pub is_business: bool,
    pub priority: i64,
    pub match_count: i64,
    pub is_active: bool,
}

/// Inferred charge cadence for a recurring vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Annually,
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
            Self::Irregular => "irregular",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annually" | "yearly" => Ok(Self::Annually),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring charge inferred from transaction history.
///
/// Derived value object, recomputed on every detection run. Invariant:
/// `occurrence_count == amounts.len() == dates.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedSubscription {
    pub vendor_normalized: String,
    /// The raw vendor text of the first occurrence, kept for display.
    pub vendor_display: String,
    pub avg_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub frequency: Frequency,
    /// Detection confidence in [0, 1]. Rewarded by occurrence count,
    /// penalized by interval and amount variance.
    pub confidence: f64,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub next_expected: NaiveDate,
    pub occurrence_count: usize,
    /// Most frequent non-null category across the group's transactions.
    pub category: Option<String>,
    /// Chronologically ordered charge amounts.
    pub amounts: Vec<f64>,
    pub dates: Vec<NaiveDate>,
    pub source_ids: Vec<String>,
}

/// One price change along a subscription's charge history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub old_amount: f64,
    pub new_amount: f64,
    pub change: f64,
    pub percent_change: f64,
    /// Date of the charge at the new amount.
    pub changed_on: NaiveDate,
}

/// A keyword-driven duplicate-spend category (e.g. two streaming services).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCategory {
    pub name: String,
    /// Substrings matched against normalized vendor names.
    pub keywords: Vec<String>,
}

/// Two or more detected subscriptions in the same service category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub category: String,
    pub vendors: Vec<String>,
    /// Combined monthly-equivalent cost of the group.
    pub monthly_cost: f64,
}

/// A single recorded purchase price for an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub vendor: String,
    pub date: NaiveDate,
}

/// Per-vendor price statistics within one item's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorPriceStat {
    pub vendor_normalized: String,
    pub average_price: f64,
    pub purchase_count: usize,
}

/// Price history summary for one normalized item name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMemory {
    pub item_name_normalized: String,
    pub last_purchase: PricePoint,
    pub cheapest: PricePoint,
    pub most_expensive: PricePoint,
    pub average_price: f64,
    pub total_purchases: usize,
    /// `last_purchase.price - cheapest.price`; non-negative by construction.
    pub potential_savings: f64,
    /// Stdev/mean of unit prices, as a percentage. 0 for degenerate sets.
    pub price_variance_coefficient: f64,
    /// Per-vendor averages, cheapest vendor first.
    pub vendor_breakdown: Vec<VendorPriceStat>,
}

/// How a vendor's average price compares to the overall average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceComparison {
    Cheaper,
    Average,
    Expensive,
}

impl PriceComparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheaper => "cheaper",
            Self::Average => "average",
            Self::Expensive => "expensive",
        }
    }
}

impl std::fmt::Display for PriceComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Purchase history summary for one normalized vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorMemory {
    pub vendor_normalized: String,
    pub total_visits: usize,
    /// Mean unit price of this vendor's line items. Note: a per-line-item
    /// average, not a per-visit total (see DESIGN.md on the field name).
    pub avg_spend_per_visit: f64,
    pub last_visit: NaiveDate,
    /// Top 5 normalized item names by purchase count at this vendor.
    pub common_items: Vec<String>,
    pub price_comparison: PriceComparison,
    /// `(vendor_avg - global_avg) / global_avg * 100`.
    pub percent_vs_overall_average: f64,
}

/// Priority tier for suggestions and insights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

impl SuggestionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Numeric rank for sorting (higher = more urgent).
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl std::str::FromStr for SuggestionPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl std::fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of savings/price suggestion produced by the memory engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// A cheaper vendor exists for an item you keep buying.
    SavingsTip,
    /// Current price is well above the last recorded price.
    PriceAlert,
    /// This vendor runs cheaper/more expensive than your average.
    VendorPricing,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SavingsTip => "savings_tip",
            Self::PriceAlert => "price_alert",
            Self::VendorPricing => "vendor_pricing",
        }
    }
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked, human-readable suggestion derived from price memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub priority: SuggestionPriority,
    pub title: String,
    pub message: String,
    /// Kind-specific structured payload.
    pub data: serde_json::Value,
}

/// The edited fields of a transaction, as submitted by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEdit {
    pub vendor: String,
    pub old_category_id: Option<String>,
    pub new_category_id: Option<String>,
    pub old_is_business: Option<bool>,
    pub new_is_business: Option<bool>,
}

/// What changed in a user correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    Category,
    BusinessFlag,
}

/// A detected manual override of a category or business flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionContext {
    pub kind: CorrectionKind,
    pub vendor: String,
    pub new_category_id: Option<String>,
    pub new_is_business: Option<bool>,
}

/// A proposed pattern rule derived from a user correction. The caller decides
/// whether to materialize it (user confirmation + duplicate check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSuggestion {
    pub pattern_text: String,
    pub match_type: MatchType,
    pub target_category_id: Option<String>,
    pub is_business: bool,
    pub reason: String,
}

/// Kind of generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    SpendingDelta,
    DuplicateSubscriptions,
    SavingsOpportunity,
    BusinessShare,
    Forecast,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpendingDelta => "spending_delta",
            Self::DuplicateSubscriptions => "duplicate_subscriptions",
            Self::SavingsOpportunity => "savings_opportunity",
            Self::BusinessShare => "business_share",
            Self::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked natural-language insight. Regenerated from current data on each
/// request, never stored as source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub priority: SuggestionPriority,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

/// Kind of budget/forecast alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BudgetBreach,
    SavingsPace,
    CategoryBudget,
    CategoryTrending,
    UpcomingBill,
    SpendingSpike,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetBreach => "budget_breach",
            Self::SavingsPace => "savings_pace",
            Self::CategoryBudget => "category_budget",
            Self::CategoryTrending => "category_trending",
            Self::UpcomingBill => "upcoming_bill",
            Self::SpendingSpike => "spending_spike",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A forecast/budget alert. All alert checks are independent; a caller may
/// receive zero, one, or many at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: SuggestionPriority,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

/// A monthly spending budget for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub category: String,
    pub amount: f64,
    /// Fraction of `amount` at which the at/over alert fires (e.g. 0.8).
    pub alert_threshold: f64,
}

/// Month-end spend projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthForecast {
    pub projected_total: f64,
    pub current_spent: f64,
    pub avg_daily_spend: f64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub recurring_remaining: f64,
}

/// A subscription row as persisted by the store, carrying the caller-owned
/// confirmation/dismissal flags that must survive re-detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSubscription {
    pub id: i64,
    pub user_id: String,
    pub vendor_normalized: String,
    pub vendor_display: String,
    pub avg_amount: f64,
    pub frequency: Frequency,
    pub confidence: f64,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub next_expected: NaiveDate,
    pub occurrence_count: i64,
    pub category: Option<String>,
    pub is_confirmed: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted price-change record (append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPriceChange {
    pub id: i64,
    pub subscription_id: i64,
    pub old_amount: f64,
    pub new_amount: f64,
    pub percent_change: f64,
    pub detected_on: NaiveDate,
}
