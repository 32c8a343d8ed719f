//! Subscription command implementations

use anyhow::Result;
use ledgerlens_core::Database;

use super::truncate;

pub fn cmd_subscriptions_list(db: &Database, user: &str) -> Result<()> {
    let subscriptions = db.list_subscriptions(user)?;

    if subscriptions.is_empty() {
        println!("No subscriptions detected yet. Run:");
        println!("  ledgerlens detect");
        return Ok(());
    }

    println!();
    println!("📋 Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────");

    for sub in subscriptions {
        let status_icon = if sub.is_dismissed {
            "🚫"
        } else if sub.is_confirmed {
            "✅"
        } else {
            "❔"
        };

        println!(
            "   {} [{:>3}] {:20} │ {:>8}/{:<9} │ next {}",
            status_icon,
            sub.id,
            truncate(&sub.vendor_display, 20),
            format!("${:.2}", sub.avg_amount),
            sub.frequency.as_str(),
            sub.next_expected,
        );

        let changes = db.list_price_changes(sub.id)?;
        for change in changes {
            println!(
                "        ↳ {:+.2}% on {} (${:.2} → ${:.2})",
                change.percent_change, change.detected_on, change.old_amount, change.new_amount
            );
        }
    }

    Ok(())
}

pub fn cmd_subscriptions_confirm(db: &Database, id: i64) -> Result<()> {
    db.confirm_subscription(id)?;
    println!("✅ Subscription {} confirmed", id);
    Ok(())
}

pub fn cmd_subscriptions_dismiss(db: &Database, id: i64) -> Result<()> {
    db.dismiss_subscription(id)?;
    println!("🚫 Subscription {} dismissed; detection will not re-create it", id);
    Ok(())
}
