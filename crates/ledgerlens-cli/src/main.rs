//! LedgerLens CLI - Spending analytics for small businesses
//!
//! Usage:
//!   ledgerlens init                    Initialize database
//!   ledgerlens import --file data.csv  Import transactions
//!   ledgerlens detect                  Detect recurring charges
//!   ledgerlens insights                Show this month's insight feed

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = commands::resolve_db_path(cli.db.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path),
        Commands::Import { file, items } => {
            let db = commands::open_db(&db_path)?;
            if items {
                commands::cmd_import_line_items(&db, &cli.user, &file)
            } else {
                commands::cmd_import_transactions(&db, &cli.user, &file)
            }
        }
        Commands::Detect => {
            let db = commands::open_db(&db_path)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_detect(&db, &cli.user, &config)
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&db_path)?;
            match action {
                None => commands::cmd_subscriptions_list(&db, &cli.user),
                Some(SubscriptionsAction::Confirm { id }) => {
                    commands::cmd_subscriptions_confirm(&db, id)
                }
                Some(SubscriptionsAction::Dismiss { id }) => {
                    commands::cmd_subscriptions_dismiss(&db, id)
                }
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&db_path)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&db, &cli.user),
                Some(RulesAction::Add {
                    pattern,
                    match_type,
                    category,
                    vendor,
                    business,
                    priority,
                }) => commands::cmd_rules_add(
                    &db,
                    &cli.user,
                    &pattern,
                    &match_type,
                    category.as_deref(),
                    vendor.as_deref(),
                    business,
                    priority,
                ),
                Some(RulesAction::Test { text, vendor }) => {
                    commands::cmd_rules_test(&db, &cli.user, &text, vendor.as_deref())
                }
            }
        }
        Commands::Memories { kind } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_memories(&db, &cli.user, &kind)
        }
        Commands::Insights => {
            let db = commands::open_db(&db_path)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_insights(&db, &cli.user, &config)
        }
        Commands::Status => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_status(&db, &cli.user)
        }
    }
}
