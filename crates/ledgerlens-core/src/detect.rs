//! Recurring-charge detection
//!
//! Detects:
//! - Recurring subscriptions: vendors charging on a regular cadence
//! - Price changes: services that quietly raised (or dropped) prices
//! - Duplicate services: multiple subscriptions in the same category
//!
//! Detection is a pure function of the transaction snapshot passed in.
//! Groups form on the normalized vendor key, cadence comes from the mean
//! gap between consecutive charges, and confidence is built additively
//! from occurrence count, interval regularity, and amount regularity.

use std::collections::HashMap;

use chrono::{Duration, Months, NaiveDate};
use tracing::debug;

use crate::models::{
    DetectedSubscription, DuplicateCategory, DuplicateGroup, Frequency, PriceChange,
    TransactionRecord,
};
use crate::normalize::normalize_vendor;

/// Detection thresholds. Defaults carry the tuned production values;
/// override via `LensConfig` when loading from TOML.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum charges for a vendor to be considered at all.
    pub min_occurrences: usize,
    /// Interval coefficient of variation above which a sparse group is
    /// discarded as too irregular.
    pub irregular_interval_cv: f64,
    /// Occurrence count at which an irregular group is trusted anyway.
    pub irregular_min_occurrences: usize,
    /// Confidence below which a sparse group is discarded as noise.
    pub min_confidence: f64,
    /// Occurrence count at which a low-confidence group is kept anyway.
    pub low_confidence_min_occurrences: usize,
    /// Relative amount delta that counts as a price change.
    pub price_change_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 2,
            irregular_interval_cv: 0.5,
            irregular_min_occurrences: 6,
            min_confidence: 0.3,
            low_confidence_min_occurrences: 4,
            price_change_threshold: 0.05,
        }
    }
}

/// Subscription detector over a static transaction snapshot.
pub struct SubscriptionDetector {
    config: DetectorConfig,
}

impl Default for SubscriptionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionDetector {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Detect recurring subscriptions in a transaction history.
    ///
    /// Records with an unusable vendor (empty after normalization) or a
    /// non-finite amount are skipped; detection never fails on partially
    /// malformed history. Output is sorted by confidence descending.
    pub fn detect(&self, transactions: &[TransactionRecord]) -> Vec<DetectedSubscription> {
        let mut by_vendor: HashMap<String, Vec<&TransactionRecord>> = HashMap::new();
        for tx in transactions {
            if !tx.amount.is_finite() {
                debug!(id = %tx.id, "Skipping transaction with non-finite amount");
                continue;
            }
            let key = normalize_vendor(&tx.vendor);
            if key.is_empty() {
                debug!(id = %tx.id, "Skipping transaction with unusable vendor");
                continue;
            }
            by_vendor.entry(key).or_default().push(tx);
        }

        let mut detections: Vec<DetectedSubscription> = Vec::new();

        for (vendor_normalized, mut group) in by_vendor {
            // A subscription cannot be inferred from a single data point
            if group.len() < self.config.min_occurrences {
                continue;
            }

            group.sort_by_key(|tx| tx.date);

            let dates: Vec<NaiveDate> = group.iter().map(|tx| tx.date).collect();
            let amounts: Vec<f64> = group.iter().map(|tx| tx.amount).collect();

            let intervals: Vec<f64> = dates
                .windows(2)
                .map(|w| (w[1] - w[0]).num_days() as f64)
                .collect();
            let avg_interval = mean(&intervals);

            // Interval variance needs at least 3 charges to mean anything
            let interval_cv = if dates.len() < 3 {
                0.0
            } else {
                coefficient_of_variation(&intervals)
            };
            let amount_cv = coefficient_of_variation(&amounts);

            // Too irregular to trust with little evidence
            if interval_cv > self.config.irregular_interval_cv
                && group.len() < self.config.irregular_min_occurrences
            {
                debug!(
                    vendor = %vendor_normalized,
                    interval_cv,
                    "Skipping irregular sparse group"
                );
                continue;
            }

            let frequency = classify_frequency(avg_interval);
            let confidence = score_confidence(group.len(), interval_cv, amount_cv);

            // Low confidence with little evidence is noise
            if confidence < self.config.min_confidence
                && group.len() < self.config.low_confidence_min_occurrences
            {
                debug!(
                    vendor = %vendor_normalized,
                    confidence,
                    "Skipping low-confidence sparse group"
                );
                continue;
            }

            let first_seen = dates[0];
            let last_seen = dates[dates.len() - 1];
            let avg_amount = mean(&amounts);
            let min_amount = amounts.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_amount = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            detections.push(DetectedSubscription {
                vendor_display: group[0].vendor.clone(),
                avg_amount,
                min_amount,
                max_amount,
                frequency,
                confidence,
                first_seen,
                last_seen,
                next_expected: advance_one_period(last_seen, frequency),
                occurrence_count: group.len(),
                category: modal_category(&group),
                amounts,
                dates,
                source_ids: group.iter().map(|tx| tx.id.clone()).collect(),
                vendor_normalized,
            });
        }

        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.vendor_normalized.cmp(&b.vendor_normalized))
        });

        debug!(count = detections.len(), "Subscription detection complete");
        detections
    }

    /// Walk a subscription's chronological amounts pairwise and report
    /// every step where the relative change meets the configured threshold.
    pub fn detect_price_changes(&self, subscription: &DetectedSubscription) -> Vec<PriceChange> {
        detect_price_changes(subscription, self.config.price_change_threshold)
    }
}

/// Price changes along a subscription's charge history.
///
/// `threshold` is the minimum relative change (e.g. 0.05 for 5%). Steps
/// from a zero amount are skipped — there is no meaningful percentage.
pub fn detect_price_changes(
    subscription: &DetectedSubscription,
    threshold: f64,
) -> Vec<PriceChange> {
    let mut changes = Vec::new();

    for (window, date) in subscription
        .amounts
        .windows(2)
        .zip(subscription.dates.iter().skip(1))
    {
        let (old, new) = (window[0], window[1]);
        if old == 0.0 {
            continue;
        }
        let change = new - old;
        let percent_change = change / old * 100.0;
        if (change / old).abs() >= threshold {
            changes.push(PriceChange {
                old_amount: old,
                new_amount: new,
                change,
                percent_change,
                changed_on: *date,
            });
        }
    }

    changes
}

/// Normalize a charge amount to a monthly-equivalent cost so subscriptions
/// on different cadences are comparable.
pub fn calculate_monthly_cost(amount: f64, frequency: Frequency) -> f64 {
    match frequency {
        Frequency::Weekly => amount * 4.33,
        Frequency::Biweekly => amount * 2.17,
        Frequency::Monthly => amount,
        Frequency::Quarterly => amount / 3.0,
        Frequency::Annually => amount / 12.0,
        Frequency::Irregular => amount,
    }
}

/// Built-in duplicate-spend categories. Callers extend this list via
/// `LensConfig::duplicate_categories`; supplied categories never replace
/// the built-ins.
pub fn builtin_duplicate_categories() -> Vec<DuplicateCategory> {
    let cat = |name: &str, keywords: &[&str]| DuplicateCategory {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    };

    vec![
        cat(
            "Streaming Video",
            &[
                "netflix",
                "hulu",
                "disney",
                "hbo",
                "paramount",
                "peacock",
                "prime video",
                "apple tv",
                "youtube premium",
            ],
        ),
        cat(
            "Music",
            &[
                "spotify",
                "apple music",
                "tidal",
                "pandora",
                "youtube music",
            ],
        ),
        cat(
            "Cloud Storage",
            &["icloud", "google one", "dropbox", "onedrive"],
        ),
        cat(
            "News & Reading",
            &[
                "nyt",
                "new york times",
                "wsj",
                "wall street journal",
                "washington post",
                "economist",
                "medium",
                "substack",
            ],
        ),
        cat(
            "Fitness",
            &[
                "peloton",
                "strava",
                "fitbit",
                "myfitnesspal",
                "headspace",
                "calm",
                "planet fitness",
            ],
        ),
    ]
}

/// Group detected subscriptions into duplicate-spend categories.
///
/// `extra` categories extend the built-in keyword lists. A category is
/// reported when at least two subscriptions match its keywords, with the
/// group's combined monthly-equivalent cost.
pub fn find_duplicate_categories(
    subscriptions: &[DetectedSubscription],
    extra: &[DuplicateCategory],
) -> Vec<DuplicateGroup> {
    let mut categories = builtin_duplicate_categories();
    categories.extend(extra.iter().cloned());

    let mut groups = Vec::new();

    for category in &categories {
        let matching: Vec<&DetectedSubscription> = subscriptions
            .iter()
            .filter(|sub| {
                category
                    .keywords
                    .iter()
                    .any(|kw| sub.vendor_normalized.contains(&kw.to_lowercase()))
            })
            .collect();

        if matching.len() >= 2 {
            let monthly_cost = matching
                .iter()
                .map(|sub| calculate_monthly_cost(sub.avg_amount, sub.frequency))
                .sum();
            groups.push(DuplicateGroup {
                category: category.name.clone(),
                vendors: matching.iter().map(|s| s.vendor_display.clone()).collect(),
                monthly_cost,
            });
        }
    }

    groups
}

/// Classify cadence from the mean gap between consecutive charges.
fn classify_frequency(avg_interval_days: f64) -> Frequency {
    if avg_interval_days <= 9.0 {
        Frequency::Weekly
    } else if avg_interval_days <= 18.0 {
        Frequency::Biweekly
    } else if avg_interval_days <= 45.0 {
        Frequency::Monthly
    } else if avg_interval_days <= 120.0 {
        Frequency::Quarterly
    } else if avg_interval_days <= 400.0 {
        Frequency::Annually
    } else {
        Frequency::Irregular
    }
}

/// Additive confidence score, capped at 1.0.
///
/// Three independent contributions: more occurrences reward, interval and
/// amount variance penalize. The ladders are fixed; retuning them means
/// re-validating every stored confidence downstream.
fn score_confidence(occurrences: usize, interval_cv: f64, amount_cv: f64) -> f64 {
    let occurrence_score: f64 = if occurrences >= 12 {
        0.40
    } else if occurrences >= 6 {
        0.30
    } else if occurrences >= 3 {
        0.20
    } else {
        0.10
    };

    let interval_score = if interval_cv < 0.10 {
        0.35
    } else if interval_cv < 0.20 {
        0.25
    } else if interval_cv < 0.30 {
        0.15
    } else {
        0.05
    };

    let amount_score = if amount_cv < 0.05 {
        0.25
    } else if amount_cv < 0.10 {
        0.20
    } else if amount_cv < 0.15 {
        0.10
    } else {
        0.05
    };

    (occurrence_score + interval_score + amount_score).min(1.0)
}

/// Advance a date by one cadence period using exact calendar arithmetic.
/// Irregular cadences default to one month.
fn advance_one_period(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Weekly => date + Duration::days(7),
        Frequency::Biweekly => date + Duration::days(14),
        Frequency::Monthly | Frequency::Irregular => {
            date.checked_add_months(Months::new(1)).unwrap_or(date)
        }
        Frequency::Quarterly => date.checked_add_months(Months::new(3)).unwrap_or(date),
        Frequency::Annually => date.checked_add_months(Months::new(12)).unwrap_or(date),
    }
}

/// Most frequently-occurring non-null category across a group, ties broken
/// by first-encountered.
fn modal_category(group: &[&TransactionRecord]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for tx in group {
        let category = tx
            .category_name
            .as_deref()
            .or(tx.category_id.as_deref())
            .filter(|c| !c.is_empty());
        if let Some(cat) = category {
            let count = counts.entry(cat).or_insert(0);
            if *count == 0 {
                order.push(cat);
            }
            *count += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for cat in order {
        let count = counts[cat];
        // Strict comparison keeps the first-encountered category on ties
        if best.map(|(_, n)| count > n).unwrap_or(true) {
            best = Some((cat, count));
        }
    }
    best.map(|(cat, _)| cat.to_string())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population stdev over mean. Defined as 0 for fewer than 2 values or a
/// zero mean — degenerate statistics never surface as NaN.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m.abs()
}
