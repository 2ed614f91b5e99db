//! Integration tests for the archive engine.
//!
//! These drive a full season of archive upkeep through the public API
//! against the in-memory backend: detect missing archives, provision
//! them, move each year across, and confirm the final scan comes back
//! clean.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use mailattic_core::provider::memory::MemoryProvider;
use mailattic_core::{
    ActivityLog, Command, CommandOutcome, Engine, FixedToday, YearOutcome,
};

const LIVE: &str = "andyw@glawster.com";

fn sent(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 10).and_then(|d| d.and_hms_opt(11, 30, 0))
}

fn seeded() -> MemoryProvider {
    let provider = MemoryProvider::new()
        .with_store(LIVE)
        .with_store("andyw@glawster.com (2022)");
    provider.add_message(LIVE, "Inbox", "invoice 2022", sent(2022, 3), None);
    provider.add_message(LIVE, "Inbox", "minutes 2023", sent(2023, 5), None);
    provider.add_message(LIVE, "Sent Items", "reply 2023", sent(2023, 6), None);
    provider.add_message(LIVE, "Inbox", "plans 2024", sent(2024, 1), None);
    provider.add_message(LIVE, "Inbox", "undatable", None, None);
    provider
}

fn engine_over(provider: &MemoryProvider) -> Engine {
    Engine::new(Arc::new(provider.clone()), Arc::new(ActivityLog::discard()))
        .with_today(Arc::new(FixedToday::new(
            NaiveDate::from_ymd_opt(2026, 8, 26).expect("valid date"),
        )))
}

#[tokio::test]
async fn test_full_archive_season() {
    let provider = seeded();
    let engine = engine_over(&provider);

    // 2022 already has an archive; 2023 and 2024 need one.
    let outcome = engine
        .dispatch(Command::ProvisionRequested { source: LIVE.to_string(), dry_run: false })
        .await
        .expect("provision");
    let CommandOutcome::Provision(report) = outcome else {
        panic!("expected a provision outcome");
    };
    let years: Vec<i32> = report.provisions.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2023, 2024]);
    assert!(report.provisions.iter().all(|p| p.outcome == YearOutcome::Created));

    // The new archives join the destination family immediately.
    let candidates = engine
        .destination_candidates(LIVE.to_string(), true)
        .await
        .expect("candidates");
    assert_eq!(
        candidates,
        vec![
            "andyw@glawster.com".to_string(),
            "andyw@glawster.com (2022)".to_string(),
            "andyw@glawster.com (2023)".to_string(),
            "andyw@glawster.com (2024)".to_string(),
        ]
    );

    // File each year into its archive.
    for year in [2022, 2023, 2024] {
        let outcome = engine
            .dispatch(Command::MoveRequested {
                source: LIVE.to_string(),
                destination: format!("andyw@glawster.com ({year})"),
                override_year: None,
                dry_run: false,
            })
            .await
            .expect("move");
        let CommandOutcome::Move(moved) = outcome else {
            panic!("expected a move outcome");
        };
        assert_eq!(moved.year, year);
        assert!(moved.moved_total() >= 1);
        assert_eq!(moved.failed_total(), 0);
    }

    assert_eq!(provider.subjects_in("andyw@glawster.com (2023)", "Inbox"), vec![
        "minutes 2023".to_string()
    ]);
    assert_eq!(provider.subjects_in("andyw@glawster.com (2023)", "Sent Items"), vec![
        "reply 2023".to_string()
    ]);

    // Everything datable is filed; archives suppress their own year, so
    // the final scan reports nothing left to do.
    let outcome = engine.dispatch(Command::ScanRequested).await.expect("scan");
    let CommandOutcome::Scan(scan) = outcome else {
        panic!("expected a scan outcome");
    };
    assert!(scan.rows.is_empty(), "unexpected rows: {:?}", scan.rows);
    assert!(scan.skipped.is_empty());

    // The undatable item was deliberately left behind.
    assert_eq!(provider.subjects_in(LIVE, "Inbox"), vec!["undatable".to_string()]);
}

#[tokio::test]
async fn test_dry_run_season_changes_nothing() {
    let provider = seeded();
    let engine = engine_over(&provider);
    let before = provider.store_names();

    let outcome = engine
        .dispatch(Command::ProvisionRequested { source: LIVE.to_string(), dry_run: true })
        .await
        .expect("provision");
    let CommandOutcome::Provision(report) = outcome else {
        panic!("expected a provision outcome");
    };
    assert!(report.provisions.iter().all(|p| p.outcome == YearOutcome::WouldCreate));

    let outcome = engine
        .dispatch(Command::MoveRequested {
            source: LIVE.to_string(),
            destination: "andyw@glawster.com (2022)".to_string(),
            override_year: None,
            dry_run: true,
        })
        .await
        .expect("move");
    let CommandOutcome::Move(moved) = outcome else {
        panic!("expected a move outcome");
    };
    assert_eq!(moved.moved_total(), 1);

    assert_eq!(provider.store_names(), before);
    assert_eq!(provider.subjects_in(LIVE, "Inbox").len(), 4);
}
