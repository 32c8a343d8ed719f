//! Insight feed, budget alerts, and price memory commands

use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::{Datelike, Local, NaiveDate};
use ledgerlens_core::models::{SuggestionPriority, TransactionRecord};
use ledgerlens_core::{
    build_item_memories, build_vendor_memories, find_duplicate_categories, forecast_month,
    generate_alerts, generate_insights, match_text, Database, InsightContext, LensConfig,
    SubscriptionDetector,
};

use super::truncate;

pub fn cmd_memories(db: &Database, user: &str, kind: &str) -> Result<()> {
    let items = db.list_line_items(user)?;
    if items.is_empty() {
        println!("No line items imported yet. Run:");
        println!("  ledgerlens import --file receipts.csv --items");
        return Ok(());
    }

    match kind {
        "items" => {
            let memories = build_item_memories(&items);
            let mut sorted: Vec<_> = memories.values().collect();
            sorted.sort_by(|a, b| {
                b.potential_savings
                    .partial_cmp(&a.potential_savings)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!();
            println!("🛒 Item price memory ({} items)", sorted.len());
            println!("   ─────────────────────────────────────────────────────────────");
            for memory in sorted {
                println!(
                    "   {:20} │ last {:>7} │ low {:>7} @ {:16} │ save {:>6}",
                    truncate(&memory.item_name_normalized, 20),
                    format!("${:.2}", memory.last_purchase.price),
                    format!("${:.2}", memory.cheapest.price),
                    truncate(&memory.cheapest.vendor, 16),
                    format!("${:.2}", memory.potential_savings),
                );
            }
        }
        "vendors" => {
            let memories = build_vendor_memories(&items);
            let mut sorted: Vec<_> = memories.values().collect();
            sorted.sort_by(|a, b| {
                b.percent_vs_overall_average
                    .partial_cmp(&a.percent_vs_overall_average)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!();
            println!("🏪 Vendor price memory ({} vendors)", sorted.len());
            println!("   ─────────────────────────────────────────────────────────────");
            for memory in sorted {
                println!(
                    "   {:20} │ {:>3} visits │ avg {:>7} │ {:9} ({:+.0}%)",
                    truncate(&memory.vendor_normalized, 20),
                    memory.total_visits,
                    format!("${:.2}", memory.avg_spend_per_visit),
                    memory.price_comparison.as_str(),
                    memory.percent_vs_overall_average,
                );
            }
        }
        other => bail!("Unknown memories kind: {} (expected items or vendors)", other),
    }

    Ok(())
}

pub fn cmd_insights(db: &Database, user: &str, config: &LensConfig) -> Result<()> {
    let transactions = db.list_transactions(user)?;
    if transactions.is_empty() {
        println!("No transactions imported yet. Run:");
        println!("  ledgerlens import --file transactions.csv");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let month_start = today.with_day(1).unwrap_or(today);

    let this_month: Vec<&TransactionRecord> = transactions
        .iter()
        .filter(|t| t.date >= month_start && t.date <= today)
        .collect();

    let current_spent: f64 = this_month.iter().map(|t| t.amount).sum();
    let days_elapsed = today.day() as f64;
    let avg_daily_spend = current_spent / days_elapsed;

    let previous_month_total = previous_month_total(&transactions, month_start);
    let historical_daily_avg = historical_daily_avg(&transactions, month_start);

    // Re-detect so upcoming charges reflect the latest history
    let detector = SubscriptionDetector::with_config(config.detector.clone());
    let detected = detector.detect(&transactions);
    let recurring_remaining: f64 = detected
        .iter()
        .filter(|s| s.next_expected > today && s.next_expected.month() == today.month())
        .map(|s| s.avg_amount)
        .sum();

    let forecast = forecast_month(current_spent, avg_daily_spend, recurring_remaining, today);

    let mut current_by_category: HashMap<String, f64> = HashMap::new();
    for tx in &this_month {
        if let Some(category) = &tx.category_name {
            *current_by_category.entry(category.clone()).or_default() += tx.amount;
        }
    }

    let alerts = generate_alerts(
        &forecast,
        &config.budgets,
        &current_by_category,
        previous_month_total,
        &detected,
        historical_daily_avg,
        today,
    );

    // Business share from the rule set
    let rules = db.list_active_rules(user)?;
    let business_spent: f64 = this_month
        .iter()
        .filter(|t| {
            match_text(&t.vendor, Some(&t.vendor), &rules)
                .map(|m| m.is_business)
                .unwrap_or(false)
        })
        .map(|t| t.amount)
        .sum();

    let line_items = db.list_line_items(user)?;
    let item_memories = build_item_memories(&line_items);
    let duplicate_groups = find_duplicate_categories(&detected, &config.duplicate_categories);

    let insights = generate_insights(&InsightContext {
        forecast: &forecast,
        previous_month_total,
        duplicate_groups: &duplicate_groups,
        item_memories: &item_memories,
        business_spent,
        total_spent: current_spent,
    });

    println!();
    println!(
        "📅 {} — spent ${:.2}, projecting ${:.2} by month end",
        today.format("%B %Y"),
        forecast.current_spent,
        forecast.projected_total
    );

    if !alerts.is_empty() {
        println!();
        println!("🚨 Alerts");
        for alert in &alerts {
            println!("   {} {}", severity_icon(alert.severity), alert.message);
        }
    }

    if !insights.is_empty() {
        println!();
        println!("💡 Insights");
        for insight in &insights {
            println!("   {} {}", severity_icon(insight.priority), insight.title);
            println!("      {}", insight.message);
        }
    }

    Ok(())
}

fn severity_icon(priority: SuggestionPriority) -> &'static str {
    match priority {
        SuggestionPriority::High => "🔴",
        SuggestionPriority::Medium => "🟡",
        SuggestionPriority::Low => "🟢",
    }
}

/// Total spend over the calendar month before `month_start`.
fn previous_month_total(transactions: &[TransactionRecord], month_start: NaiveDate) -> Option<f64> {
    let prev_start = month_start.pred_opt().and_then(|d| d.with_day(1))?;
    let in_prev: Vec<_> = transactions
        .iter()
        .filter(|t| t.date >= prev_start && t.date < month_start)
        .collect();
    if in_prev.is_empty() {
        return None;
    }
    Some(in_prev.iter().map(|t| t.amount).sum())
}

/// Long-run daily average over everything before the current month.
fn historical_daily_avg(
    transactions: &[TransactionRecord],
    month_start: NaiveDate,
) -> Option<f64> {
    let earlier: Vec<_> = transactions.iter().filter(|t| t.date < month_start).collect();
    let first = earlier.iter().map(|t| t.date).min()?;
    let days = (month_start - first).num_days();
    if days <= 0 {
        return None;
    }
    let total: f64 = earlier.iter().map(|t| t.amount).sum();
    Some(total / days as f64)
}
