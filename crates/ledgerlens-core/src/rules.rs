//! Pattern rule matching
//!
//! Pure first-match evaluation of user-defined categorization rules over
//! vendor or item text. Rules arrive pre-sorted `(priority DESC, match_count
//! DESC)` — `Database::list_active_rules` returns them that way — and the
//! matcher walks them in the given order, so higher-priority and
//! historically more successful rules win ties.
//!
//! The match-count reinforcement loop is deliberately split out of this
//! module: `match_text` is pure, and the caller bumps the winning rule via
//! `Database::record_rule_match` afterwards.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{MatchType, PatternRule};
use crate::normalize::normalize_text;

/// The winning rule's categorization outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub rule_id: i64,
    pub pattern_text: String,
    pub target_category_id: Option<String>,
    pub is_business: bool,
}

impl MatchResult {
    fn from_rule(rule: &PatternRule) -> Self {
        Self {
            rule_id: rule.id,
            pattern_text: rule.pattern_text.clone(),
            target_category_id: rule.target_category_id.clone(),
            is_business: rule.is_business,
        }
    }
}

/// Sort rules into match order: `(priority DESC, match_count DESC)`.
///
/// The store already returns rules in this order; this helper exists for
/// callers holding rules from elsewhere (tests, imports).
pub fn sort_rules(rules: &mut [PatternRule]) {
    rules.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.match_count.cmp(&a.match_count))
    });
}

/// Check one rule's pattern against already-normalized candidate text.
fn pattern_matches(candidate: &str, rule: &PatternRule) -> bool {
    let pattern = normalize_text(&rule.pattern_text);
    if pattern.is_empty() {
        return false;
    }

    match rule.match_type {
        MatchType::Exact => candidate == pattern,
        MatchType::StartsWith => candidate.starts_with(&pattern),
        MatchType::Contains => candidate.contains(&pattern),
    }
}

/// Check a rule's vendor constraint against the supplied vendor context.
///
/// A rule with a non-empty vendor pattern is skipped unless the call
/// supplies a vendor containing that sub-pattern (case-insensitive). With a
/// vendor constraint and no vendor supplied, the rule never matches.
fn vendor_constraint_ok(rule: &PatternRule, vendor: Option<&str>) -> bool {
    let constraint = match &rule.vendor_pattern {
        Some(p) if !p.trim().is_empty() => p,
        _ => return true,
    };

    match vendor {
        Some(v) => v.to_lowercase().contains(&constraint.to_lowercase()),
        None => false,
    }
}

/// Return the first rule in the given order that matches `text`.
///
/// Inactive rules are skipped. Returns `None` for an empty rule set or when
/// nothing matches. Pure: repeated calls with the same inputs return the
/// same result.
pub fn match_text(
    text: &str,
    vendor: Option<&str>,
    rules: &[PatternRule],
) -> Option<MatchResult> {
    let candidate = normalize_text(text);
    if candidate.is_empty() {
        return None;
    }

    for rule in rules {
        if !rule.is_active {
            continue;
        }
        if !vendor_constraint_ok(rule, vendor) {
            continue;
        }
        if pattern_matches(&candidate, rule) {
            debug!(
                rule_id = rule.id,
                pattern = %rule.pattern_text,
                "Rule matched '{}'",
                text
            );
            return Some(MatchResult::from_rule(rule));
        }
    }

    None
}

/// Match many candidate texts against one rule set.
///
/// Each text is evaluated independently; texts with no match are absent
/// from the map.
pub fn match_batch(texts: &[String], rules: &[PatternRule]) -> HashMap<String, MatchResult> {
    let mut results = HashMap::new();
    for text in texts {
        if let Some(result) = match_text(text, None, rules) {
            results.insert(text.clone(), result);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, pattern: &str, match_type: MatchType, priority: i64) -> PatternRule {
        PatternRule {
            id,
            pattern_text: pattern.to_string(),
            match_type,
            vendor_pattern: None,
            target_category_id: Some(format!("cat-{}", id)),
            is_business: false,
            priority,
            match_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_contains_match() {
        let rules = vec![rule(1, "shell", MatchType::Contains, 0)];
        let result = match_text("SHELL GAS STATION #42", None, &rules).unwrap();
        assert_eq!(result.rule_id, 1);
    }

    #[test]
    fn test_exact_match() {
        let rules = vec![rule(1, "Netflix", MatchType::Exact, 0)];
        assert!(match_text("NETFLIX", None, &rules).is_some());
        assert!(match_text("NETFLIX PREMIUM", None, &rules).is_none());
    }

    #[test]
    fn test_starts_with_match() {
        let rules = vec![rule(1, "uber", MatchType::StartsWith, 0)];
        assert!(match_text("UBER EATS", None, &rules).is_some());
        assert!(match_text("MY UBER RIDE", None, &rules).is_none());
    }

    #[test]
    fn test_first_match_wins_in_given_order() {
        // Pre-sorted per contract: priority=1 rule first despite lower match_count
        let mut rules = vec![
            {
                let mut r = rule(1, "shell", MatchType::Contains, 0);
                r.match_count = 5;
                r
            },
            rule(2, "shell gas", MatchType::Contains, 1),
        ];
        sort_rules(&mut rules);
        let result = match_text("Shell Gas Station", None, &rules).unwrap();
        assert_eq!(result.rule_id, 2);
    }

    #[test]
    fn test_sort_rules_tie_break_on_match_count() {
        let mut rules = vec![
            {
                let mut r = rule(1, "a", MatchType::Contains, 5);
                r.match_count = 1;
                r
            },
            {
                let mut r = rule(2, "b", MatchType::Contains, 5);
                r.match_count = 9;
                r
            },
        ];
        sort_rules(&mut rules);
        assert_eq!(rules[0].id, 2);
    }

    #[test]
    fn test_inactive_rule_skipped() {
        let mut r = rule(1, "shell", MatchType::Contains, 0);
        r.is_active = false;
        assert!(match_text("SHELL", None, &[r]).is_none());
    }

    #[test]
    fn test_vendor_constraint() {
        let mut r = rule(1, "milk", MatchType::Contains, 0);
        r.vendor_pattern = Some("costco".to_string());
        let rules = vec![r];

        // No vendor supplied: rule never matches
        assert!(match_text("Organic Milk", None, &rules).is_none());
        // Wrong vendor
        assert!(match_text("Organic Milk", Some("Safeway"), &rules).is_none());
        // Matching vendor, case-insensitive
        assert!(match_text("Organic Milk", Some("COSTCO WHOLESALE"), &rules).is_some());
    }

    #[test]
    fn test_empty_rule_set_and_empty_text() {
        assert!(match_text("anything", None, &[]).is_none());
        let rules = vec![rule(1, "x", MatchType::Contains, 0)];
        assert!(match_text("", None, &rules).is_none());
        assert!(match_text("***", None, &rules).is_none());
    }

    #[test]
    fn test_determinism() {
        let rules = vec![
            rule(1, "coffee", MatchType::Contains, 2),
            rule(2, "espresso", MatchType::Contains, 1),
        ];
        let a = match_text("Blue Bottle Coffee", None, &rules);
        let b = match_text("Blue Bottle Coffee", None, &rules);
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_independent_per_text() {
        let rules = vec![
            rule(1, "netflix", MatchType::Contains, 1),
            rule(2, "spotify", MatchType::Contains, 0),
        ];
        let texts = vec![
            "NETFLIX.COM".to_string(),
            "Spotify USA".to_string(),
            "Unmatched Vendor".to_string(),
        ];
        let results = match_batch(&texts, &rules);
        assert_eq!(results.len(), 2);
        assert_eq!(results["NETFLIX.COM"].rule_id, 1);
        assert_eq!(results["Spotify USA"].rule_id, 2);
        assert!(!results.contains_key("Unmatched Vendor"));
    }
}
