//! `mailattic` - Console for organizing retained mail into yearly archives
//!
//! Points the archive engine at a directory of stores (or an in-memory
//! demo set) and drives it from an interactive prompt.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod args;
mod config;
mod repl;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailattic_core::provider::memory::MemoryProvider;
use mailattic_core::{ActivityLog, Connect, Engine};
use mailattic_dirstore::DirConnector;

use args::Args;
use config::Settings;
use repl::Repl;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "mailattic=info,mailattic_core=info,mailattic_dirstore=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("starting mailattic");

    let settings = Settings::load().unwrap_or_else(|error| {
        tracing::warn!(%error, "settings unreadable, using defaults");
        Settings::default()
    });

    let log = Arc::new(
        ActivityLog::open(args.activity_dir(), "mailattic").context("opening the activity log")?,
    );
    if let Some(path) = log.current_path() {
        info!(path = %path.display(), "activity log");
    }

    let connector: Arc<dyn Connect> = if args.demo {
        println!("demo mode: in-memory stores, nothing touches disk");
        Arc::new(demo_provider())
    } else {
        let root = args.root.clone().context("a storage root is required without --demo")?;
        Arc::new(DirConnector::new(root))
    };

    let engine = Arc::new(Engine::new(connector, log));
    Repl::new(engine, settings).run().await
}

/// Fixture stores for `--demo`: one live mailbox spanning several years,
/// one existing yearly archive, and one store outside the account family.
fn demo_provider() -> MemoryProvider {
    let provider = MemoryProvider::new()
        .with_store("andyw@glawster.com")
        .with_store("andyw@glawster.com (2023)")
        .with_store("Archive");

    let live = "andyw@glawster.com";
    provider.add_message(live, "Inbox", "Welcome aboard", stamp(2022, 3, 4), None);
    provider.add_message(live, "Inbox", "Quarterly figures", stamp(2022, 11, 21), None);
    provider.add_message(live, "Inbox", "January invoice", stamp(2023, 1, 12), None);
    provider.add_message(live, "Inbox", "Renewal notice", stamp(2023, 6, 30), None);
    provider.add_message(live, "Inbox", "Conference agenda", stamp(2023, 9, 8), None);
    provider.add_message(live, "Inbox", "Happy new year", stamp(2024, 1, 1), None);
    provider.add_message(live, "Inbox", "No date survives on this one", None, None);
    provider.add_message(live, "Sent Items", "Re: January invoice", stamp(2023, 1, 13), None);
    provider.add_message(live, "Sent Items", "Travel booking", stamp(2024, 2, 19), None);

    provider.add_message("Archive", "Inbox", "Old minutes", stamp(2020, 5, 5), None);

    provider
}

fn stamp(year: i32, month: u32, day: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day).and_then(|date| date.and_hms_opt(9, 30, 0))
}
