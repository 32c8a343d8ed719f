//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, detect, status) and shared utilities
//! - `import` - CSV/JSON history import
//! - `insights` - Insight feed, budget alerts, price memories
//! - `rules` - Rule management commands
//! - `subscriptions` - Subscription management commands

pub mod core;
pub mod import;
pub mod insights;
pub mod rules;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use self::core::*;
pub use import::*;
pub use insights::*;
pub use rules::*;
pub use subscriptions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
///
/// Counts characters, not bytes, so multi-byte vendor names never split
/// mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate("Netflix", 20), "Netflix");
        assert_eq!(truncate("", 5), "");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("A Very Long Vendor Name", 10), "A Very ...");
    }

    #[test]
    fn test_truncate_multibyte_vendor() {
        // "Caffè Nero Épicerie" holds multi-byte characters near the cut
        assert_eq!(truncate("Caffè Nero Épicerie", 10), "Caffè N...");
        assert_eq!(truncate("日本食料品店のとても長い名前", 8), "日本食料品...");
    }
}
