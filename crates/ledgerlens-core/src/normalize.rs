//! Vendor and item name normalization
//!
//! Free-text names from bank feeds and receipts vary wildly for the same
//! counterparty ("NETFLIX.COM", "Netflix", "netflix inc"). Every grouping
//! operation downstream (subscription detection, price memory, rule
//! suggestions) keys on the normalized form produced here, so these
//! functions must be deterministic and idempotent.

/// Corporate and domain suffixes stripped from vendor names as whole words.
/// Domain parts ("com", "www") land here because punctuation stripping turns
/// "NETFLIX.COM" into "netflix com", which must group with plain "Netflix".
const VENDOR_STOPWORDS: &[&str] = &[
    "inc", "llc", "corp", "store", "market", "shop", "grocery", "com", "www",
];

/// Size/quality qualifiers stripped from item names as whole words.
const ITEM_STOPWORDS: &[&str] = &[
    "organic", "fresh", "premium", "regular", "large", "small", "medium", "pack", "pkg", "ct",
    "oz", "lb", "kg", "g", "ml", "l",
];

/// Lowercase, strip punctuation, collapse whitespace.
///
/// The canonical fold used at rule-match time: both the candidate text and
/// the rule pattern pass through this before comparison, without any
/// stopword stripping.
pub fn normalize_text(text: &str) -> String {
    base_normalize(text)
}

fn base_normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove stopwords as whole words, then re-collapse whitespace.
fn strip_stopwords(text: &str, stopwords: &[&str]) -> String {
    text.split_whitespace()
        .filter(|word| !stopwords.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize a vendor name into a grouping key.
///
/// Total function: never fails, empty/whitespace input yields an empty string.
pub fn normalize_vendor(text: &str) -> String {
    strip_stopwords(&base_normalize(text), VENDOR_STOPWORDS)
}

/// Canonicalize an item name into a grouping key.
pub fn normalize_item(text: &str) -> String {
    strip_stopwords(&base_normalize(text), ITEM_STOPWORDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_basic() {
        assert_eq!(normalize_vendor("NETFLIX.COM"), "netflix");
        assert_eq!(normalize_vendor("Netflix"), "netflix");
        assert_eq!(normalize_vendor("netflix inc"), "netflix");
        assert_eq!(normalize_vendor("  Whole   Foods  "), "whole foods");
    }

    #[test]
    fn test_vendor_suffix_stripping() {
        assert_eq!(normalize_vendor("netflix inc"), "netflix");
        assert_eq!(normalize_vendor("Acme Corp."), "acme");
        assert_eq!(normalize_vendor("Joe's Grocery Store"), "joe s");
        // Suffix words are only stripped as whole words
        assert_eq!(normalize_vendor("Incline Village"), "incline village");
    }

    #[test]
    fn test_item_qualifier_stripping() {
        assert_eq!(normalize_item("Organic Milk 1 L"), "milk 1");
        assert_eq!(normalize_item("Premium Coffee 12 oz pack"), "coffee 12");
        assert_eq!(normalize_item("large eggs"), "eggs");
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(normalize_vendor(""), "");
        assert_eq!(normalize_vendor("   "), "");
        assert_eq!(normalize_vendor("***"), "");
        assert_eq!(normalize_item("!!!"), "");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "NETFLIX.COM*12345",
            "Joe's Grocery Store",
            "  Premium   Organic  Milk ",
            "shell gas #42",
            "",
        ];
        for input in inputs {
            let once = normalize_vendor(input);
            assert_eq!(normalize_vendor(&once), once, "vendor: {:?}", input);
            let once = normalize_item(input);
            assert_eq!(normalize_item(&once), once, "item: {:?}", input);
        }
    }
}
