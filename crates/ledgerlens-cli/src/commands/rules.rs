//! Rule management commands

use anyhow::{anyhow, Result};
use ledgerlens_core::models::MatchType;
use ledgerlens_core::{match_text, Database, NewRule};

use super::truncate;

pub fn cmd_rules_list(db: &Database, user: &str) -> Result<()> {
    let rules = db.list_rules(user)?;

    if rules.is_empty() {
        println!("No rules yet. Add one with:");
        println!("  ledgerlens rules add \"netflix\" --category streaming");
        return Ok(());
    }

    println!();
    println!("📐 Rules (match order)");
    println!("   ─────────────────────────────────────────────────────────────");
    for rule in rules {
        let active = if rule.is_active { " " } else { "✗" };
        println!(
            "   {}[{:>3}] {:24} │ {:11} │ prio {:>2} │ used {:>3} │ {}",
            active,
            rule.id,
            truncate(&rule.pattern_text, 24),
            rule.match_type.as_str(),
            rule.priority,
            rule.match_count,
            rule.target_category_id.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_rules_add(
    db: &Database,
    user: &str,
    pattern: &str,
    match_type: &str,
    category: Option<&str>,
    vendor: Option<&str>,
    business: bool,
    priority: i64,
) -> Result<()> {
    let match_type: MatchType = match_type
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    if db.rule_exists_for_pattern(user, pattern)? {
        println!("⚠️  A rule for \"{}\" already exists", pattern);
        return Ok(());
    }

    let id = db.insert_rule(
        user,
        &NewRule {
            pattern_text: pattern,
            match_type,
            vendor_pattern: vendor,
            target_category_id: category,
            is_business: business,
            priority,
        },
    )?;

    println!("✅ Rule {} added: {} ({})", id, pattern, match_type.as_str());
    Ok(())
}

pub fn cmd_rules_test(db: &Database, user: &str, text: &str, vendor: Option<&str>) -> Result<()> {
    let rules = db.list_active_rules(user)?;
    match match_text(text, vendor, &rules) {
        Some(result) => {
            println!(
                "✅ \"{}\" matches rule {} (\"{}\")",
                text, result.rule_id, result.pattern_text
            );
            println!(
                "   category: {} │ business: {}",
                result.target_category_id.as_deref().unwrap_or("-"),
                result.is_business
            );
        }
        None => println!("No rule matches \"{}\"", text),
    }
    Ok(())
}
