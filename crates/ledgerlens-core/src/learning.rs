//! Rule learning from user corrections
//!
//! When a user manually overrides a category or business flag on a
//! transaction, that edit is a signal: the same vendor will probably want
//! the same treatment next time. This module turns such corrections into
//! proposed pattern rules. It is stateless — the caller confirms with the
//! user, checks `Database::rule_exists_for_pattern`, and honors the
//! "don't ask again" exclusion set before materializing anything.

use std::collections::HashSet;

use crate::models::{
    CategoryEdit, CorrectionContext, CorrectionKind, LearningSuggestion, MatchType,
};
use crate::normalize::normalize_vendor;

/// Single-word patterns up to this length suggest an exact match; anything
/// longer or multi-word gets a contains match.
const EXACT_PATTERN_MAX_LEN: usize = 15;

/// Detect whether an edit constitutes a correction worth learning from.
///
/// A correction exists only if the vendor text is non-empty and either the
/// category assignment changed (to a non-empty value) or the business flag
/// changed (strict boolean inequality, new flag present). Category change
/// takes priority when both differ in one edit.
pub fn detect_correction(edit: &CategoryEdit) -> Option<CorrectionContext> {
    let vendor = edit.vendor.trim();
    if vendor.is_empty() {
        return None;
    }

    let category_changed = match &edit.new_category_id {
        Some(new) if !new.is_empty() => edit.old_category_id.as_deref() != Some(new.as_str()),
        _ => false,
    };

    if category_changed {
        return Some(CorrectionContext {
            kind: CorrectionKind::Category,
            vendor: vendor.to_string(),
            new_category_id: edit.new_category_id.clone(),
            new_is_business: edit.new_is_business,
        });
    }

    let flag_changed = match (edit.old_is_business, edit.new_is_business) {
        (Some(old), Some(new)) => old != new,
        (None, Some(_)) => true,
        _ => false,
    };

    if flag_changed {
        return Some(CorrectionContext {
            kind: CorrectionKind::BusinessFlag,
            vendor: vendor.to_string(),
            new_category_id: None,
            new_is_business: edit.new_is_business,
        });
    }

    None
}

/// Pick the match type for a suggested pattern: exact for a single short
/// word, contains otherwise.
fn suggested_match_type(pattern: &str) -> MatchType {
    let single_word = !pattern.contains(' ');
    if single_word && pattern.len() <= EXACT_PATTERN_MAX_LEN {
        MatchType::Exact
    } else {
        MatchType::Contains
    }
}

/// Build a rule suggestion from a detected correction.
///
/// Returns `None` when the vendor normalizes to an empty pattern — a
/// suggestion is never fabricated from unusable text.
pub fn build_suggestion(context: &CorrectionContext) -> Option<LearningSuggestion> {
    let pattern = normalize_vendor(&context.vendor);
    if pattern.is_empty() {
        return None;
    }

    let reason = match context.kind {
        CorrectionKind::Category => format!(
            "You recategorized a {} transaction; future matches can be categorized automatically",
            context.vendor
        ),
        CorrectionKind::BusinessFlag => format!(
            "You changed the business flag on a {} transaction; future matches can be flagged automatically",
            context.vendor
        ),
    };

    Some(LearningSuggestion {
        match_type: suggested_match_type(&pattern),
        pattern_text: pattern,
        target_category_id: context.new_category_id.clone(),
        is_business: context.new_is_business.unwrap_or(false),
        reason,
    })
}

/// Convenience wrapper for the call site: detect a correction, honor the
/// caller-resolved "don't ask again" exclusion set, and build the
/// suggestion in one step.
pub fn suggest_from_edit(
    edit: &CategoryEdit,
    excluded_patterns: &HashSet<String>,
) -> Option<LearningSuggestion> {
    let context = detect_correction(edit)?;
    let suggestion = build_suggestion(&context)?;
    if excluded_patterns.contains(&suggestion.pattern_text) {
        return None;
    }
    Some(suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(vendor: &str) -> CategoryEdit {
        CategoryEdit {
            vendor: vendor.to_string(),
            old_category_id: Some("meals".to_string()),
            new_category_id: Some("travel".to_string()),
            old_is_business: None,
            new_is_business: None,
        }
    }

    #[test]
    fn test_category_change_detected() {
        let ctx = detect_correction(&edit("Delta Airlines")).unwrap();
        assert_eq!(ctx.kind, CorrectionKind::Category);
        assert_eq!(ctx.new_category_id.as_deref(), Some("travel"));
    }

    #[test]
    fn test_no_change_no_correction() {
        let mut e = edit("Delta Airlines");
        e.new_category_id = Some("meals".to_string());
        assert!(detect_correction(&e).is_none());

        e.new_category_id = None;
        assert!(detect_correction(&e).is_none());
    }

    #[test]
    fn test_empty_new_category_ignored() {
        let mut e = edit("Delta");
        e.new_category_id = Some(String::new());
        assert!(detect_correction(&e).is_none());
    }

    #[test]
    fn test_business_flag_change() {
        let e = CategoryEdit {
            vendor: "Office Depot".to_string(),
            old_category_id: None,
            new_category_id: None,
            old_is_business: Some(false),
            new_is_business: Some(true),
        };
        let ctx = detect_correction(&e).unwrap();
        assert_eq!(ctx.kind, CorrectionKind::BusinessFlag);
        assert_eq!(ctx.new_is_business, Some(true));
    }

    #[test]
    fn test_category_takes_priority_over_flag() {
        let e = CategoryEdit {
            vendor: "Office Depot".to_string(),
            old_category_id: Some("a".to_string()),
            new_category_id: Some("b".to_string()),
            old_is_business: Some(false),
            new_is_business: Some(true),
        };
        let ctx = detect_correction(&e).unwrap();
        assert_eq!(ctx.kind, CorrectionKind::Category);
    }

    #[test]
    fn test_empty_vendor_never_corrects() {
        assert!(detect_correction(&edit("")).is_none());
        assert!(detect_correction(&edit("   ")).is_none());
    }

    #[test]
    fn test_single_short_word_gets_exact() {
        let ctx = detect_correction(&edit("Netflix")).unwrap();
        let s = build_suggestion(&ctx).unwrap();
        assert_eq!(s.pattern_text, "netflix");
        assert_eq!(s.match_type, MatchType::Exact);
    }

    #[test]
    fn test_multi_word_gets_contains() {
        let ctx = detect_correction(&edit("Whole Foods Market")).unwrap();
        let s = build_suggestion(&ctx).unwrap();
        assert_eq!(s.pattern_text, "whole foods");
        assert_eq!(s.match_type, MatchType::Contains);
    }

    #[test]
    fn test_long_single_word_gets_contains() {
        let ctx = detect_correction(&edit("Extraordinarilylongvendorname")).unwrap();
        let s = build_suggestion(&ctx).unwrap();
        assert_eq!(s.match_type, MatchType::Contains);
    }

    #[test]
    fn test_punctuation_only_vendor_builds_nothing() {
        let ctx = detect_correction(&edit("***")).unwrap();
        assert!(build_suggestion(&ctx).is_none());
    }

    #[test]
    fn test_exclusion_set_honored() {
        let mut excluded = HashSet::new();
        excluded.insert("netflix".to_string());
        assert!(suggest_from_edit(&edit("Netflix"), &excluded).is_none());
        assert!(suggest_from_edit(&edit("Hulu"), &excluded).is_some());
    }
}
