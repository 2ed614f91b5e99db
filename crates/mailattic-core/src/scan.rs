//! Aggregate scan across every store.
//!
//! Counts classifiable items per store, canonical subfolder and year so
//! the user can see where mail is piling up before planning moves. The
//! scan mutates nothing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::activity::ActivityLog;
use crate::classify;
use crate::engine::{CancelToken, StatusFeed};
use crate::error::Result;
use crate::provider::{CANONICAL_FOLDERS, MailSession};

/// One (store, folder, year) count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRow {
    /// Store display name.
    pub store: String,
    /// Canonical subfolder the items sit in.
    pub folder: String,
    /// Effective year of the counted items.
    pub year: i32,
    /// How many items carry that year.
    pub count: usize,
}

/// A store/folder pair left out of the counts, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedUnit {
    /// Store display name.
    pub store: String,
    /// Canonical subfolder that could not be counted.
    pub folder: String,
    /// Human-readable failure description.
    pub reason: String,
}

/// Outcome of one aggregate scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Counts, sorted by store name, then year, then folder name.
    pub rows: Vec<ScanRow>,
    /// Units that failed to enumerate and were skipped.
    pub skipped: Vec<SkippedUnit>,
    /// Whether the scan stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Counts classifiable items in every store's canonical subfolders.
///
/// Rows whose year already appears parenthesized in the store's own name
/// are suppressed: mail that made it into `a@b.com (2023)` does not need
/// to be reported as 2023 work. The comparison is a literal substring
/// check against `(year)`.
///
/// A folder that cannot be opened or listed skips just that unit; the
/// scan carries on and reports the skip.
///
/// # Errors
///
/// Returns an error only when the store list itself cannot be enumerated.
pub fn scan(
    session: &dyn MailSession,
    status: &StatusFeed,
    log: &ActivityLog,
    cancel: &CancelToken,
) -> Result<ScanReport> {
    log.info("starting aggregate scan of all stores");

    // Keyed so iteration yields the reporting order directly.
    let mut counts: BTreeMap<(String, i32, String), usize> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut cancelled = false;

    'stores: for store in session.list_stores()? {
        let store_name = store.name();
        for folder_name in CANONICAL_FOLDERS {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'stores;
            }
            status.set(format!("scanning: {store_name} > {folder_name}"));

            let items = match store.folder(folder_name).and_then(|f| f.items()) {
                Ok(items) => items,
                Err(error) => {
                    log.warn(&format!("skipping {store_name} > {folder_name}: {error}"));
                    skipped.push(SkippedUnit {
                        store: store_name.clone(),
                        folder: folder_name.to_string(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            for item in items {
                if let Some(year) = classify::effective_year(item.as_ref()) {
                    *counts
                        .entry((store_name.clone(), year, folder_name.to_string()))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    let rows: Vec<ScanRow> = counts
        .into_iter()
        .filter(|((store, year, _), _)| !store.contains(&format!("({year})")))
        .map(|((store, year, folder), count)| ScanRow { store, folder, year, count })
        .collect();

    if cancelled {
        log.warn("aggregate scan cancelled before completion");
    }
    log.info(&format!("aggregate scan done: {} rows, {} skipped", rows.len(), skipped.len()));
    debug!(rows = rows.len(), skipped = skipped.len(), cancelled, "scan finished");

    Ok(ScanReport { rows, skipped, cancelled })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::provider::Connect;
    use crate::provider::memory::MemoryProvider;

    fn day(year: i32, month: u32, day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(9, 30, 0))
    }

    fn run(provider: &MemoryProvider) -> ScanReport {
        let session = provider.connect().unwrap();
        scan(
            session.as_ref(),
            &StatusFeed::default(),
            &ActivityLog::discard(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn counts_by_store_year_and_folder() {
        let provider = MemoryProvider::new().with_store("a@b.com");
        provider.add_message("a@b.com", "Inbox", "one", day(2023, 1, 2), None);
        provider.add_message("a@b.com", "Inbox", "two", day(2023, 5, 6), None);
        provider.add_message("a@b.com", "Sent Items", "three", day(2024, 3, 4), None);

        let report = run(&provider);
        assert_eq!(
            report.rows,
            vec![
                ScanRow { store: "a@b.com".into(), folder: "Inbox".into(), year: 2023, count: 2 },
                ScanRow {
                    store: "a@b.com".into(),
                    folder: "Sent Items".into(),
                    year: 2024,
                    count: 1
                },
            ]
        );
        assert!(report.skipped.is_empty());
        assert!(!report.cancelled);
    }

    #[test]
    fn rows_sort_by_store_then_year_then_folder() {
        let provider = MemoryProvider::new().with_store("beta").with_store("alpha");
        provider.add_message("beta", "Inbox", "b1", day(2020, 1, 1), None);
        provider.add_message("alpha", "Sent Items", "a2", day(2021, 1, 1), None);
        provider.add_message("alpha", "Inbox", "a1", day(2020, 1, 1), None);

        let order: Vec<(String, i32, String)> = run(&provider)
            .rows
            .into_iter()
            .map(|r| (r.store, r.year, r.folder))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha".into(), 2020, "Inbox".into()),
                ("alpha".into(), 2021, "Sent Items".into()),
                ("beta".into(), 2020, "Inbox".into()),
            ]
        );
    }

    #[test]
    fn suppresses_years_already_in_the_store_name() {
        let provider = MemoryProvider::new().with_store("a@b.com (2023)");
        provider.add_message("a@b.com (2023)", "Inbox", "filed", day(2023, 2, 2), None);
        provider.add_message("a@b.com (2023)", "Inbox", "stray", day(2022, 2, 2), None);

        let report = run(&provider);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].year, 2022);
    }

    #[test]
    fn undatable_items_are_not_counted() {
        let provider = MemoryProvider::new().with_store("a@b.com");
        provider.add_message("a@b.com", "Inbox", "no dates", None, None);
        provider.add_message("a@b.com", "Inbox", "received only", None, day(2021, 7, 8));

        let report = run(&provider);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].year, 2021);
        assert_eq!(report.rows[0].count, 1);
    }

    #[test]
    fn unreadable_units_are_skipped_not_fatal() {
        let provider = MemoryProvider::new().with_store("good").with_store("bad");
        provider.add_message("good", "Inbox", "kept", day(2022, 1, 1), None);
        provider.fail_enumeration("bad", "Inbox");

        let report = run(&provider);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].store, "bad");
        assert_eq!(report.skipped[0].folder, "Inbox");
    }

    #[test]
    fn missing_canonical_folder_is_a_skip() {
        let provider = MemoryProvider::new();
        provider.add_bare_store("empty");

        let report = run(&provider);
        assert!(report.rows.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn cancellation_stops_the_walk() {
        let provider = MemoryProvider::new().with_store("a@b.com");
        provider.add_message("a@b.com", "Inbox", "one", day(2023, 1, 2), None);
        let cancel = CancelToken::new();
        cancel.cancel();

        let session = provider.connect().unwrap();
        let report =
            scan(session.as_ref(), &StatusFeed::default(), &ActivityLog::discard(), &cancel)
                .unwrap();
        assert!(report.cancelled);
        assert!(report.rows.is_empty());
    }
}
