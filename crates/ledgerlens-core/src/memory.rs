//! Price and vendor memory
//!
//! Builds a "memory" of what the user has paid for each item and at each
//! vendor, then derives savings and price-alert suggestions from it.
//! Everything is a pure function of the line-item snapshot passed in;
//! grouping keys come from the normalizer.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{
    ItemMemory, LineItemRecord, PriceComparison, PricePoint, Suggestion, SuggestionKind,
    SuggestionPriority, VendorMemory, VendorPriceStat,
};
use crate::normalize::{normalize_item, normalize_vendor};

/// Minimum relative margin over the cheapest price before a savings tip
/// is worth surfacing.
const SAVINGS_MARGIN: f64 = 0.05;

/// Relative rise over the last recorded price that triggers a price alert.
const PRICE_ALERT_MARGIN: f64 = 0.10;

/// Build per-item price memories, keyed by normalized item name.
///
/// Records with an unusable item name or non-finite price are skipped.
pub fn build_item_memories(history: &[LineItemRecord]) -> HashMap<String, ItemMemory> {
    let mut by_item: HashMap<String, Vec<&LineItemRecord>> = HashMap::new();
    for item in history {
        if !item.unit_price.is_finite() {
            continue;
        }
        let key = normalize_item(&item.item_name);
        if key.is_empty() {
            continue;
        }
        by_item.entry(key).or_default().push(item);
    }

    let mut memories = HashMap::new();

    for (key, group) in by_item {
        // Linear scans; ties keep the first-encountered record
        let mut last = group[0];
        let mut cheapest = group[0];
        let mut most_expensive = group[0];
        for item in &group[1..] {
            if item.purchase_date > last.purchase_date {
                last = item;
            }
            if item.unit_price < cheapest.unit_price {
                cheapest = item;
            }
            if item.unit_price > most_expensive.unit_price {
                most_expensive = item;
            }
        }

        let prices: Vec<f64> = group.iter().map(|i| i.unit_price).collect();
        let average_price = mean(&prices);

        let mut vendor_breakdown = vendor_breakdown(&group);
        vendor_breakdown.sort_by(|a, b| {
            a.average_price
                .partial_cmp(&b.average_price)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        memories.insert(
            key.clone(),
            ItemMemory {
                item_name_normalized: key,
                last_purchase: price_point(last),
                potential_savings: last.unit_price - cheapest.unit_price,
                cheapest: price_point(cheapest),
                most_expensive: price_point(most_expensive),
                average_price,
                total_purchases: group.len(),
                price_variance_coefficient: variance_percent(&prices),
                vendor_breakdown,
            },
        );
    }

    debug!(items = memories.len(), "Item memories built");
    memories
}

/// Build per-vendor memories, keyed by normalized vendor name.
///
/// `avg_spend_per_visit` is the mean unit price of the vendor's line items,
/// not a per-visit total; the comparison percentage is against the global
/// line-item average across all input.
pub fn build_vendor_memories(history: &[LineItemRecord]) -> HashMap<String, VendorMemory> {
    let mut by_vendor: HashMap<String, Vec<&LineItemRecord>> = HashMap::new();
    let mut all_prices: Vec<f64> = Vec::new();
    for item in history {
        if !item.unit_price.is_finite() {
            continue;
        }
        let key = normalize_vendor(&item.vendor);
        if key.is_empty() {
            continue;
        }
        all_prices.push(item.unit_price);
        by_vendor.entry(key).or_default().push(item);
    }

    let global_avg = mean(&all_prices);
    let mut memories = HashMap::new();

    for (key, group) in by_vendor {
        let prices: Vec<f64> = group.iter().map(|i| i.unit_price).collect();
        let vendor_avg = mean(&prices);

        let percent = if global_avg == 0.0 {
            0.0
        } else {
            (vendor_avg - global_avg) / global_avg * 100.0
        };

        let comparison = if percent > 5.0 {
            PriceComparison::Expensive
        } else if percent < -5.0 {
            PriceComparison::Cheaper
        } else {
            PriceComparison::Average
        };

        let mut last_visit = group[0].purchase_date;
        for item in &group[1..] {
            if item.purchase_date > last_visit {
                last_visit = item.purchase_date;
            }
        }

        memories.insert(
            key.clone(),
            VendorMemory {
                vendor_normalized: key,
                total_visits: group.len(),
                avg_spend_per_visit: vendor_avg,
                last_visit,
                common_items: common_items(&group),
                price_comparison: comparison,
                percent_vs_overall_average: percent,
            },
        );
    }

    debug!(vendors = memories.len(), "Vendor memories built");
    memories
}

/// Derive savings/price suggestions for a batch of (typically just
/// purchased) items against the accumulated memories.
///
/// Output is sorted by priority tier, preserving relative order within a
/// tier.
pub fn suggestions_for_items(
    items: &[LineItemRecord],
    item_memories: &HashMap<String, ItemMemory>,
    vendor_memory: Option<&VendorMemory>,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for item in items {
        let key = normalize_item(&item.item_name);
        let Some(memory) = item_memories.get(&key) else {
            continue;
        };

        if let Some(tip) = savings_tip(item, memory) {
            suggestions.push(tip);
        }
        if let Some(alert) = price_alert(item, memory) {
            suggestions.push(alert);
        }
    }

    if let Some(vendor) = vendor_memory {
        if let Some(s) = vendor_suggestion(vendor) {
            suggestions.push(s);
        }
    }

    // Stable sort keeps relative order within a tier
    suggestions.sort_by_key(|s| std::cmp::Reverse(s.priority.rank()));
    suggestions
}

/// Savings tip: a cheaper vendor exists for an item bought repeatedly.
///
/// Requires ≥2 recorded purchases, a current price at least 5% over the
/// cheapest, and the current vendor not already being the cheapest one.
fn savings_tip(item: &LineItemRecord, memory: &ItemMemory) -> Option<Suggestion> {
    if memory.total_purchases < 2 {
        return None;
    }

    let current_price = item.unit_price;
    let cheapest = &memory.cheapest;
    let savings = current_price - cheapest.price;
    if current_price <= 0.0 || savings < SAVINGS_MARGIN * current_price {
        return None;
    }

    // Don't suggest switching to where you already are
    if normalize_vendor(&item.vendor) == normalize_vendor(&cheapest.vendor) {
        return None;
    }

    let savings_percent = savings / current_price * 100.0;
    let priority = if savings_percent > 15.0 {
        SuggestionPriority::High
    } else if savings_percent > 10.0 {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    };

    Some(Suggestion {
        kind: SuggestionKind::SavingsTip,
        priority,
        title: format!("Cheaper {} nearby", item.item_name.trim()),
        message: format!(
            "You paid {:.2} for {} at {}; {} had it for {:.2}. Potential savings: {:.2}",
            current_price,
            item.item_name.trim(),
            item.vendor.trim(),
            cheapest.vendor,
            cheapest.price,
            savings
        ),
        data: serde_json::json!({
            "item": memory.item_name_normalized,
            "current_price": current_price,
            "cheapest_price": cheapest.price,
            "cheapest_vendor": cheapest.vendor,
            "savings": savings,
            "savings_percent": savings_percent,
        }),
    })
}

/// Price alert: current price is more than 10% above the last recorded one.
fn price_alert(item: &LineItemRecord, memory: &ItemMemory) -> Option<Suggestion> {
    let last = memory.last_purchase.price;
    if last <= 0.0 {
        return None;
    }
    let rise = (item.unit_price - last) / last;
    if rise <= PRICE_ALERT_MARGIN {
        return None;
    }

    let priority = if rise > 0.25 {
        SuggestionPriority::High
    } else {
        SuggestionPriority::Medium
    };

    Some(Suggestion {
        kind: SuggestionKind::PriceAlert,
        priority,
        title: format!("Price up on {}", item.item_name.trim()),
        message: format!(
            "{} is {:.2}, up {:.0}% from the {:.2} you last paid",
            item.item_name.trim(),
            item.unit_price,
            rise * 100.0,
            last
        ),
        data: serde_json::json!({
            "item": memory.item_name_normalized,
            "current_price": item.unit_price,
            "last_price": last,
            "rise_percent": rise * 100.0,
        }),
    })
}

/// Vendor-pricing suggestion, only for vendors with enough history.
fn vendor_suggestion(vendor: &VendorMemory) -> Option<Suggestion> {
    if vendor.total_visits < 3 {
        return None;
    }

    let percent = vendor.percent_vs_overall_average;
    if percent > 10.0 {
        let priority = if percent > 20.0 {
            SuggestionPriority::High
        } else {
            SuggestionPriority::Medium
        };
        Some(Suggestion {
            kind: SuggestionKind::VendorPricing,
            priority,
            title: format!("{} runs expensive", vendor.vendor_normalized),
            message: format!(
                "Prices at {} average {:.0}% above your overall average",
                vendor.vendor_normalized, percent
            ),
            data: serde_json::json!({
                "vendor": vendor.vendor_normalized,
                "percent_vs_average": percent,
            }),
        })
    } else if percent < -10.0 {
        Some(Suggestion {
            kind: SuggestionKind::VendorPricing,
            priority: SuggestionPriority::Low,
            title: format!("{} runs cheap", vendor.vendor_normalized),
            message: format!(
                "Prices at {} average {:.0}% below your overall average",
                vendor.vendor_normalized,
                percent.abs()
            ),
            data: serde_json::json!({
                "vendor": vendor.vendor_normalized,
                "percent_vs_average": percent,
            }),
        })
    } else {
        None
    }
}

fn price_point(item: &LineItemRecord) -> PricePoint {
    PricePoint {
        price: item.unit_price,
        vendor: item.vendor.clone(),
        date: item.purchase_date,
    }
}

/// Per-vendor average price and purchase count within one item group.
fn vendor_breakdown(group: &[&LineItemRecord]) -> Vec<VendorPriceStat> {
    let mut totals: HashMap<String, (f64, usize)> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for item in group {
        let key = normalize_vendor(&item.vendor);
        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            (0.0, 0)
        });
        entry.0 += item.unit_price;
        entry.1 += 1;
    }

    order
        .into_iter()
        .map(|vendor| {
            let (sum, count) = totals[&vendor];
            VendorPriceStat {
                vendor_normalized: vendor,
                average_price: sum / count as f64,
                purchase_count: count,
            }
        })
        .collect()
}

/// Top 5 normalized item names by purchase count, first-encountered ties.
fn common_items(group: &[&LineItemRecord]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for item in group {
        let key = normalize_item(&item.item_name);
        if key.is_empty() {
            continue;
        }
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|key| {
            let count = counts[&key];
            (key, count)
        })
        .collect();
    // Stable sort: ties keep first-encountered order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(5).map(|(key, _)| key).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population stdev over mean as a percentage; 0 for degenerate sets.
fn variance_percent(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m.abs() * 100.0
}
