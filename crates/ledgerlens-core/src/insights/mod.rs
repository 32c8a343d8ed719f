//! Forecasting and proactive insights
//!
//! Two surfaces live here. `forecast` projects month-end spend and raises
//! independent budget/pace alerts. `generate_insights` builds the broader
//! ranked feed (spending deltas, duplicate-subscription spend, savings
//! opportunities, business share) shown to the user, capped at a handful of
//! items so it stays glanceable.

pub mod forecast;

pub use forecast::{forecast_month, generate_alerts};

use std::collections::HashMap;

use tracing::debug;

use crate::models::{
    DuplicateGroup, Insight, InsightKind, ItemMemory, MonthForecast, SuggestionPriority,
};

/// Maximum number of insights surfaced at once.
const MAX_INSIGHTS: usize = 6;

/// Month-over-month change below this percentage is not worth reporting.
const DELTA_FLOOR_PERCENT: f64 = 5.0;

/// Everything the insight feed draws on, resolved by the caller.
#[derive(Debug, Clone)]
pub struct InsightContext<'a> {
    pub forecast: &'a MonthForecast,
    pub previous_month_total: Option<f64>,
    pub duplicate_groups: &'a [DuplicateGroup],
    pub item_memories: &'a HashMap<String, ItemMemory>,
    /// Month-to-date spend flagged as business expense.
    pub business_spent: f64,
    pub total_spent: f64,
}

/// Build the ranked insight feed.
///
/// Sorted by priority (stable within a tier, so generation order breaks
/// ties) and capped at 6 entries.
pub fn generate_insights(ctx: &InsightContext) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(i) = spending_delta(ctx) {
        insights.push(i);
    }
    insights.extend(duplicate_spend(ctx));
    if let Some(i) = top_savings_opportunity(ctx) {
        insights.push(i);
    }
    if let Some(i) = business_share(ctx) {
        insights.push(i);
    }
    if let Some(i) = forecast_summary(ctx) {
        insights.push(i);
    }

    insights.sort_by_key(|i| std::cmp::Reverse(i.priority.rank()));
    insights.truncate(MAX_INSIGHTS);

    debug!(count = insights.len(), "Insights generated");
    insights
}

/// Month-over-month projected spending change.
fn spending_delta(ctx: &InsightContext) -> Option<Insight> {
    let previous = ctx.previous_month_total?;
    if previous <= 0.0 {
        return None;
    }

    let projected = ctx.forecast.projected_total;
    let delta_percent = (projected - previous) / previous * 100.0;
    if delta_percent.abs() < DELTA_FLOOR_PERCENT {
        return None;
    }

    let rising = delta_percent > 0.0;
    let priority = if delta_percent > 25.0 {
        SuggestionPriority::High
    } else if rising {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    };

    Some(Insight {
        id: "spending_delta".to_string(),
        kind: InsightKind::SpendingDelta,
        priority,
        title: if rising {
            "Spending is up from last month".to_string()
        } else {
            "Spending is down from last month".to_string()
        },
        message: format!(
            "Projected {:.2} vs {:.2} last month ({}{:.0}%)",
            projected,
            previous,
            if rising { "+" } else { "" },
            delta_percent
        ),
        data: serde_json::json!({
            "projected_total": projected,
            "previous_month_total": previous,
            "delta_percent": delta_percent,
        }),
    })
}

/// One insight per overlapping-subscription group.
fn duplicate_spend(ctx: &InsightContext) -> Vec<Insight> {
    ctx.duplicate_groups
        .iter()
        .map(|group| Insight {
            id: format!("duplicates:{}", group.category.to_lowercase().replace(' ', "_")),
            kind: InsightKind::DuplicateSubscriptions,
            priority: SuggestionPriority::Medium,
            title: format!("Multiple {} subscriptions", group.category),
            message: format!(
                "{} together cost about {:.2}/month; consider keeping one",
                group.vendors.join(", "),
                group.monthly_cost
            ),
            data: serde_json::json!({
                "category": group.category,
                "vendors": group.vendors,
                "monthly_cost": group.monthly_cost,
            }),
        })
        .collect()
}

/// The single largest item-level savings the memories know about.
fn top_savings_opportunity(ctx: &InsightContext) -> Option<Insight> {
    let best = ctx
        .item_memories
        .values()
        .filter(|m| m.potential_savings > 0.0 && m.total_purchases >= 2)
        .max_by(|a, b| {
            a.potential_savings
                .partial_cmp(&b.potential_savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let priority = if best.potential_savings > 5.0 {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    };

    Some(Insight {
        id: format!("savings:{}", best.item_name_normalized.replace(' ', "_")),
        kind: InsightKind::SavingsOpportunity,
        priority,
        title: format!("Cheaper {} available", best.item_name_normalized),
        message: format!(
            "You last paid {:.2} for {}; {} had it for {:.2}",
            best.last_purchase.price,
            best.item_name_normalized,
            best.cheapest.vendor,
            best.cheapest.price
        ),
        data: serde_json::json!({
            "item": best.item_name_normalized,
            "last_price": best.last_purchase.price,
            "cheapest_price": best.cheapest.price,
            "cheapest_vendor": best.cheapest.vendor,
            "savings": best.potential_savings,
        }),
    })
}

/// Share of month-to-date spend flagged as business expense.
fn business_share(ctx: &InsightContext) -> Option<Insight> {
    if ctx.total_spent <= 0.0 || ctx.business_spent <= 0.0 {
        return None;
    }
    let share = ctx.business_spent / ctx.total_spent * 100.0;

    Some(Insight {
        id: "business_share".to_string(),
        kind: InsightKind::BusinessShare,
        priority: SuggestionPriority::Low,
        title: "Business expense share".to_string(),
        message: format!(
            "{:.2} of {:.2} spent this month ({:.0}%) is flagged as business expense",
            ctx.business_spent, ctx.total_spent, share
        ),
        data: serde_json::json!({
            "business_spent": ctx.business_spent,
            "total_spent": ctx.total_spent,
            "share_percent": share,
        }),
    })
}

/// Plain month-end projection, always low priority.
fn forecast_summary(ctx: &InsightContext) -> Option<Insight> {
    if ctx.forecast.projected_total <= 0.0 {
        return None;
    }

    Some(Insight {
        id: "forecast".to_string(),
        kind: InsightKind::Forecast,
        priority: SuggestionPriority::Low,
        title: "Month-end projection".to_string(),
        message: format!(
            "On pace to spend {:.2} this month ({:.2} so far, {} days left)",
            ctx.forecast.projected_total, ctx.forecast.current_spent, ctx.forecast.days_remaining
        ),
        data: serde_json::json!({
            "projected_total": ctx.forecast.projected_total,
            "current_spent": ctx.forecast.current_spent,
            "days_remaining": ctx.forecast.days_remaining,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PricePoint, VendorPriceStat};
    use chrono::NaiveDate;

    fn forecast(projected: f64) -> MonthForecast {
        MonthForecast {
            projected_total: projected,
            current_spent: projected / 2.0,
            avg_daily_spend: 20.0,
            days_elapsed: 15,
            days_remaining: 15,
            recurring_remaining: 0.0,
        }
    }

    fn memory(item: &str, last: f64, cheapest: f64, purchases: usize) -> ItemMemory {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        ItemMemory {
            item_name_normalized: item.to_string(),
            last_purchase: PricePoint {
                price: last,
                vendor: "Store A".to_string(),
                date,
            },
            cheapest: PricePoint {
                price: cheapest,
                vendor: "Store B".to_string(),
                date,
            },
            most_expensive: PricePoint {
                price: last,
                vendor: "Store A".to_string(),
                date,
            },
            average_price: (last + cheapest) / 2.0,
            total_purchases: purchases,
            potential_savings: last - cheapest,
            price_variance_coefficient: 0.0,
            vendor_breakdown: Vec::<VendorPriceStat>::new(),
        }
    }

    fn base_ctx<'a>(
        f: &'a MonthForecast,
        memories: &'a HashMap<String, ItemMemory>,
    ) -> InsightContext<'a> {
        InsightContext {
            forecast: f,
            previous_month_total: None,
            duplicate_groups: &[],
            item_memories: memories,
            business_spent: 0.0,
            total_spent: 0.0,
        }
    }

    #[test]
    fn test_spending_delta_direction_and_priority() {
        let f = forecast(1300.0);
        let empty = HashMap::new();
        let mut ctx = base_ctx(&f, &empty);
        ctx.previous_month_total = Some(1000.0);
        let insights = generate_insights(&ctx);
        let delta = insights
            .iter()
            .find(|i| i.kind == InsightKind::SpendingDelta)
            .unwrap();
        assert_eq!(delta.priority, SuggestionPriority::High);

        // Rising but under 25%: 1300 vs 1200 is +8.3%
        ctx.previous_month_total = Some(1200.0);
        let insights = generate_insights(&ctx);
        let delta = insights
            .iter()
            .find(|i| i.kind == InsightKind::SpendingDelta)
            .unwrap();
        assert_eq!(delta.priority, SuggestionPriority::Medium);

        // Falling: 1300 vs 1400 is -7.1%
        ctx.previous_month_total = Some(1400.0);
        let insights = generate_insights(&ctx);
        let delta = insights
            .iter()
            .find(|i| i.kind == InsightKind::SpendingDelta)
            .unwrap();
        assert_eq!(delta.priority, SuggestionPriority::Low);

        // Under the 5% floor: nothing reported
        ctx.previous_month_total = Some(1290.0);
        let insights = generate_insights(&ctx);
        assert!(!insights
            .iter()
            .any(|i| i.kind == InsightKind::SpendingDelta));
    }

    #[test]
    fn test_duplicate_groups_become_insights() {
        let f = forecast(100.0);
        let groups = vec![DuplicateGroup {
            category: "Streaming Video".to_string(),
            vendors: vec!["netflix".to_string(), "hulu".to_string()],
            monthly_cost: 28.98,
        }];
        let empty = HashMap::new();
        let mut ctx = base_ctx(&f, &empty);
        ctx.duplicate_groups = &groups;

        let insights = generate_insights(&ctx);
        let dup = insights
            .iter()
            .find(|i| i.kind == InsightKind::DuplicateSubscriptions)
            .unwrap();
        assert_eq!(dup.id, "duplicates:streaming_video");
        assert!(dup.message.contains("netflix"));
    }

    #[test]
    fn test_top_savings_picks_largest() {
        let f = forecast(100.0);
        let mut memories = HashMap::new();
        memories.insert("milk".to_string(), memory("milk", 3.50, 2.80, 3));
        memories.insert("coffee".to_string(), memory("coffee", 14.00, 8.00, 2));
        memories.insert("once".to_string(), memory("once", 9.00, 4.00, 1));
        let empty = HashMap::new();
        let mut ctx = base_ctx(&f, &empty);
        ctx.item_memories = &memories;

        let insights = generate_insights(&ctx);
        let savings = insights
            .iter()
            .find(|i| i.kind == InsightKind::SavingsOpportunity)
            .unwrap();
        // coffee saves 6.00; the single-purchase item is ignored
        assert_eq!(savings.data["item"], "coffee");
        assert_eq!(savings.priority, SuggestionPriority::Medium);
    }

    #[test]
    fn test_business_share_reported() {
        let f = forecast(100.0);
        let empty = HashMap::new();
        let mut ctx = base_ctx(&f, &empty);
        ctx.business_spent = 300.0;
        ctx.total_spent = 1200.0;

        let insights = generate_insights(&ctx);
        let share = insights
            .iter()
            .find(|i| i.kind == InsightKind::BusinessShare)
            .unwrap();
        assert!((share.data["share_percent"].as_f64().unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_and_priority_order() {
        let f = forecast(2000.0);
        let groups: Vec<DuplicateGroup> = (0..8)
            .map(|i| DuplicateGroup {
                category: format!("Category {}", i),
                vendors: vec!["a".to_string(), "b".to_string()],
                monthly_cost: 10.0,
            })
            .collect();
        let empty = HashMap::new();
        let mut ctx = base_ctx(&f, &empty);
        ctx.previous_month_total = Some(1000.0);
        ctx.duplicate_groups = &groups;

        let insights = generate_insights(&ctx);
        assert_eq!(insights.len(), MAX_INSIGHTS);
        // High-priority delta first, then medium duplicates in input order
        assert_eq!(insights[0].kind, InsightKind::SpendingDelta);
        assert_eq!(insights[1].id, "duplicates:category_0");
        assert_eq!(insights[2].id, "duplicates:category_1");
    }

    #[test]
    fn test_empty_context_yields_forecast_only() {
        let f = forecast(100.0);
        let empty = HashMap::new();
        let insights = generate_insights(&base_ctx(&f, &empty));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Forecast);
    }
}
