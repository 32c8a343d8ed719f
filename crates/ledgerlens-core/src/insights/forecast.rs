//! Month-end forecast and budget alerts
//!
//! The forecast is simple linear extrapolation: what was spent so far, plus
//! the average daily burn over the remaining days, plus known recurring
//! charges that have not hit yet. Alerts are independent checks over the
//! forecast; any number of them can fire at once.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

use crate::models::{
    Alert, AlertKind, Budget, DetectedSubscription, MonthForecast, SuggestionPriority,
};

/// Spike alerts need at least this many elapsed days of the month before
/// the month-to-date average is meaningful.
const SPIKE_MIN_DAYS: i64 = 7;

/// Month-to-date daily average over historical daily average that counts
/// as a spending spike.
const SPIKE_RATIO: f64 = 1.5;

/// Bills due within this many days get an upcoming-bill alert.
const UPCOMING_BILL_DAYS: u64 = 7;

/// Number of days in `date`'s calendar month.
fn days_in_month(date: NaiveDate) -> i64 {
    let first = date.with_day(1).unwrap_or(date);
    let next_first = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    match next_first {
        Some(n) => (n - first).num_days(),
        None => 30,
    }
}

/// Project spend to the end of `today`'s calendar month.
///
/// `projected_total = current_spent + avg_daily_spend * days_remaining +
/// recurring_remaining`, where `days_remaining` counts the days left in the
/// month after today.
pub fn forecast_month(
    current_spent: f64,
    avg_daily_spend: f64,
    recurring_remaining: f64,
    today: NaiveDate,
) -> MonthForecast {
    let days_elapsed = today.day() as i64;
    let days_remaining = days_in_month(today) - days_elapsed;

    let projected_total = current_spent + avg_daily_spend * days_remaining as f64 + recurring_remaining;

    debug!(
        projected_total,
        days_remaining, "Month forecast computed"
    );

    MonthForecast {
        projected_total,
        current_spent,
        avg_daily_spend,
        days_elapsed,
        days_remaining,
        recurring_remaining,
    }
}

/// Evaluate all alert conditions against a forecast.
///
/// Every check is independent; the result may hold zero or many alerts.
/// `current_by_category` holds month-to-date spend keyed by category name,
/// `upcoming` is the known recurring charges with their expected dates, and
/// `historical_daily_avg` is the caller's long-run daily spend baseline.
pub fn generate_alerts(
    forecast: &MonthForecast,
    budgets: &[Budget],
    current_by_category: &HashMap<String, f64>,
    previous_month_total: Option<f64>,
    upcoming: &[DetectedSubscription],
    historical_daily_avg: Option<f64>,
    today: NaiveDate,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(alert) = budget_breach(forecast, budgets) {
        alerts.push(alert);
    }
    if let Some(alert) = savings_pace(forecast, previous_month_total) {
        alerts.push(alert);
    }
    alerts.extend(category_alerts(forecast, budgets, current_by_category));
    alerts.extend(upcoming_bills(upcoming, today));
    if let Some(alert) = spending_spike(forecast, historical_daily_avg) {
        alerts.push(alert);
    }

    debug!(count = alerts.len(), "Alerts generated");
    alerts
}

/// Projected total exceeds the sum of all monthly budgets.
fn budget_breach(forecast: &MonthForecast, budgets: &[Budget]) -> Option<Alert> {
    if budgets.is_empty() {
        return None;
    }
    let total_budget: f64 = budgets.iter().map(|b| b.amount).sum();
    if forecast.projected_total <= total_budget {
        return None;
    }

    Some(Alert {
        kind: AlertKind::BudgetBreach,
        severity: SuggestionPriority::High,
        title: "On track to exceed your budget".to_string(),
        message: format!(
            "Projected spend {:.2} is over your total monthly budget of {:.2}",
            forecast.projected_total, total_budget
        ),
        data: serde_json::json!({
            "projected_total": forecast.projected_total,
            "total_budget": total_budget,
            "overage": forecast.projected_total - total_budget,
        }),
    })
}

/// Projected total comes in well under last month.
fn savings_pace(forecast: &MonthForecast, previous_month_total: Option<f64>) -> Option<Alert> {
    let previous = previous_month_total?;
    if previous <= 0.0 || forecast.projected_total >= previous * 0.9 {
        return None;
    }

    Some(Alert {
        kind: AlertKind::SavingsPace,
        severity: SuggestionPriority::Low,
        title: "Spending less than last month".to_string(),
        message: format!(
            "Projected spend {:.2} is under 90% of last month's {:.2}",
            forecast.projected_total, previous
        ),
        data: serde_json::json!({
            "projected_total": forecast.projected_total,
            "previous_month_total": previous,
        }),
    })
}

/// Per-category at/over-threshold and trending-over alerts.
fn category_alerts(
    forecast: &MonthForecast,
    budgets: &[Budget],
    current_by_category: &HashMap<String, f64>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let month_days = forecast.days_elapsed + forecast.days_remaining;

    for budget in budgets {
        if budget.amount <= 0.0 {
            continue;
        }
        let spent = current_by_category
            .get(&budget.category)
            .copied()
            .unwrap_or(0.0);

        if spent >= budget.amount * budget.alert_threshold {
            let severity = if spent >= budget.amount {
                SuggestionPriority::High
            } else {
                SuggestionPriority::Medium
            };
            alerts.push(Alert {
                kind: AlertKind::CategoryBudget,
                severity,
                title: format!("{} budget {}", budget.category, if spent >= budget.amount { "exceeded" } else { "nearly used" }),
                message: format!(
                    "{:.2} of the {:.2} {} budget is spent",
                    spent, budget.amount, budget.category
                ),
                data: serde_json::json!({
                    "category": budget.category,
                    "spent": spent,
                    "budget": budget.amount,
                    "threshold": budget.alert_threshold,
                }),
            });
        } else if forecast.days_elapsed > 0 {
            // Trending over: linear projection exceeds the budget while
            // actual spend is still under the threshold
            let projected = spent / forecast.days_elapsed as f64 * month_days as f64;
            if projected > budget.amount {
                alerts.push(Alert {
                    kind: AlertKind::CategoryTrending,
                    severity: SuggestionPriority::Low,
                    title: format!("{} trending over budget", budget.category),
                    message: format!(
                        "At the current pace, {} spend projects to {:.2} against a {:.2} budget",
                        budget.category, projected, budget.amount
                    ),
                    data: serde_json::json!({
                        "category": budget.category,
                        "spent": spent,
                        "projected": projected,
                        "budget": budget.amount,
                    }),
                });
            }
        }
    }

    alerts
}

/// One alert per recurring charge due within the next 7 days.
fn upcoming_bills(upcoming: &[DetectedSubscription], today: NaiveDate) -> Vec<Alert> {
    let window_end = today
        .checked_add_days(Days::new(UPCOMING_BILL_DAYS))
        .unwrap_or(today);

    upcoming
        .iter()
        .filter(|sub| sub.next_expected >= today && sub.next_expected <= window_end)
        .map(|sub| Alert {
            kind: AlertKind::UpcomingBill,
            severity: SuggestionPriority::Medium,
            title: format!("{} due soon", sub.vendor_display),
            message: format!(
                "{} (~{:.2}) is expected on {}",
                sub.vendor_display, sub.avg_amount, sub.next_expected
            ),
            data: serde_json::json!({
                "vendor": sub.vendor_normalized,
                "amount": sub.avg_amount,
                "due": sub.next_expected,
            }),
        })
        .collect()
}

/// Month-to-date daily average well above the historical baseline.
///
/// Suppressed until a week of the month has elapsed so a single expensive
/// day does not trip it.
fn spending_spike(forecast: &MonthForecast, historical_daily_avg: Option<f64>) -> Option<Alert> {
    let historical = historical_daily_avg?;
    if historical <= 0.0 || forecast.days_elapsed < SPIKE_MIN_DAYS {
        return None;
    }

    let mtd_daily = forecast.current_spent / forecast.days_elapsed as f64;
    if mtd_daily <= historical * SPIKE_RATIO {
        return None;
    }

    Some(Alert {
        kind: AlertKind::SpendingSpike,
        severity: SuggestionPriority::High,
        title: "Spending spike this month".to_string(),
        message: format!(
            "Daily average {:.2} is more than 50% above your usual {:.2}",
            mtd_daily, historical
        ),
        data: serde_json::json!({
            "mtd_daily_average": mtd_daily,
            "historical_daily_average": historical,
        }),
    })
}
