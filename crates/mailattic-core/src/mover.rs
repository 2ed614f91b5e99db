//! Year-targeted relocation of items between stores.
//!
//! A move walks both canonical subfolders of the source store and
//! relocates every item whose effective year matches the target into the
//! same-named subfolder of the destination store. The walk snapshots each
//! folder before touching it, so relocations never disturb the iteration.

use chrono::Datelike;
use serde::Serialize;
use tracing::debug;

use crate::activity::ActivityLog;
use crate::catalog;
use crate::classify;
use crate::engine::{CancelToken, StatusFeed};
use crate::error::{Error, Result};
use crate::naming;
use crate::provider::{CANONICAL_FOLDERS, MailFolder, MailSession, MailStore};

/// A requested relocation of one year's mail between two stores.
#[derive(Debug, Clone)]
pub struct MovePlan {
    /// Source store display name.
    pub source: String,
    /// Destination store display name.
    pub destination: String,
    /// Explicit target year. When `None` the year is read from the
    /// destination name.
    pub override_year: Option<i32>,
    /// Count matches without relocating anything.
    pub dry_run: bool,
}

/// Counters for one canonical subfolder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FolderTally {
    /// Items relocated, or merely matched in a dry run.
    pub moved: usize,
    /// Items that matched but could not be relocated.
    pub failed: usize,
}

/// What a move run did.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    /// Source store display name.
    pub source: String,
    /// Destination store display name.
    pub destination: String,
    /// Year the run targeted.
    pub year: i32,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Tally for the Inbox pass.
    pub inbox: FolderTally,
    /// Tally for the Sent Items pass.
    pub sent: FolderTally,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl MoveOutcome {
    /// Total items relocated (or matched, in a dry run) across both
    /// subfolder passes.
    #[must_use]
    pub const fn moved_total(&self) -> usize {
        self.inbox.moved + self.sent.moved
    }

    /// Total items that matched but failed to relocate.
    #[must_use]
    pub const fn failed_total(&self) -> usize {
        self.inbox.failed + self.sent.failed
    }
}

/// Runs a move plan against an open session.
///
/// Both stores get their canonical subfolders ensured before anything is
/// examined, dry run or not. A single item that refuses to relocate is
/// logged and counted; it never aborts the run.
///
/// # Errors
///
/// Returns [`Error::FolderResolution`] when either store or any of the
/// four canonical subfolders cannot be resolved, and
/// [`Error::YearNotFound`] when no target year can be determined.
pub fn execute(
    session: &dyn MailSession,
    plan: &MovePlan,
    status: &StatusFeed,
    log: &ActivityLog,
    cancel: &CancelToken,
) -> Result<MoveOutcome> {
    let source = session.store(&plan.source).map_err(|error| Error::FolderResolution {
        what: format!("store '{}'", plan.source),
        source: error,
    })?;
    let destination = session.store(&plan.destination).map_err(|error| {
        Error::FolderResolution { what: format!("store '{}'", plan.destination), source: error }
    })?;

    catalog::ensure_canonical_folders(source.as_ref(), log);
    catalog::ensure_canonical_folders(destination.as_ref(), log);

    let year = resolve_year(plan)?;

    let dry = if plan.dry_run { " (dry run)" } else { "" };
    status.set(format!("moving {year} mail: '{}' -> '{}'{dry}", plan.source, plan.destination));
    log.info(&format!(
        "starting move of {year} mail from '{}' to '{}'{dry}",
        plan.source, plan.destination
    ));

    let mut outcome = MoveOutcome {
        source: plan.source.clone(),
        destination: plan.destination.clone(),
        year,
        dry_run: plan.dry_run,
        inbox: FolderTally::default(),
        sent: FolderTally::default(),
        cancelled: false,
    };

    for folder_name in CANONICAL_FOLDERS {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }
        let (tally, cancelled) = move_folder(
            source.as_ref(),
            destination.as_ref(),
            folder_name,
            year,
            plan.dry_run,
            log,
            cancel,
        )?;
        if folder_name == "Inbox" {
            outcome.inbox = tally;
        } else {
            outcome.sent = tally;
        }
        outcome.cancelled = cancelled;
    }

    if outcome.cancelled {
        log.warn("move cancelled before completion");
    }
    log.info(&format!(
        "move finished: {} moved, {} failed{dry}",
        outcome.moved_total(),
        outcome.failed_total()
    ));
    Ok(outcome)
}

fn resolve_year(plan: &MovePlan) -> Result<i32> {
    if let Some(year) = plan.override_year {
        return Ok(year);
    }
    naming::year_of(&plan.destination)
        .ok_or_else(|| Error::YearNotFound { destination: plan.destination.clone() })
}

fn resolve_folder(store: &dyn MailStore, name: &str) -> Result<Box<dyn MailFolder>> {
    store.folder(name).map_err(|error| Error::FolderResolution {
        what: format!("folder '{name}' in store '{}'", store.name()),
        source: error,
    })
}

fn move_folder(
    source: &dyn MailStore,
    destination: &dyn MailStore,
    folder_name: &str,
    year: i32,
    dry_run: bool,
    log: &ActivityLog,
    cancel: &CancelToken,
) -> Result<(FolderTally, bool)> {
    let from = resolve_folder(source, folder_name)?;
    let into = resolve_folder(destination, folder_name)?;

    let items = from.items()?;
    log.info(&format!("{folder_name}: {} items in source", items.len()));

    let mut tally = FolderTally::default();
    for item in items {
        if cancel.is_cancelled() {
            return Ok((tally, true));
        }
        let Some(date) = classify::effective_date(item.as_ref()) else {
            continue;
        };
        if date.year() != year {
            continue;
        }

        log.info(&format!("moving: {folder_name} | {} | {}", date.date(), item.subject()));
        if dry_run {
            tally.moved += 1;
            continue;
        }
        match item.move_to(into.as_ref()) {
            Ok(()) => tally.moved += 1,
            Err(error) => {
                tally.failed += 1;
                log.error(&format!("could not move item in {folder_name}: {error}"));
                debug!(folder = folder_name, %error, "item move failed");
            }
        }
    }
    Ok((tally, false))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::provider::Connect;
    use crate::provider::memory::MemoryProvider;

    fn day(year: i32, month: u32, day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(14, 0, 0))
    }

    fn plan(source: &str, destination: &str) -> MovePlan {
        MovePlan {
            source: source.to_string(),
            destination: destination.to_string(),
            override_year: None,
            dry_run: false,
        }
    }

    fn run(provider: &MemoryProvider, plan: &MovePlan) -> Result<MoveOutcome> {
        let session = provider.connect().unwrap();
        execute(
            session.as_ref(),
            plan,
            &StatusFeed::default(),
            &ActivityLog::discard(),
            &CancelToken::new(),
        )
    }

    fn seeded() -> MemoryProvider {
        let provider =
            MemoryProvider::new().with_store("a@b.com").with_store("a@b.com (2023)");
        provider.add_message("a@b.com", "Inbox", "in 2023", day(2023, 3, 1), None);
        provider.add_message("a@b.com", "Inbox", "in 2024", day(2024, 3, 1), None);
        provider.add_message("a@b.com", "Sent Items", "sent 2023", day(2023, 4, 1), None);
        provider.add_message("a@b.com", "Sent Items", "undated", None, None);
        provider
    }

    #[test]
    fn moves_only_the_target_year() {
        let provider = seeded();
        let outcome = run(&provider, &plan("a@b.com", "a@b.com (2023)")).unwrap();

        assert_eq!(outcome.year, 2023);
        assert_eq!(outcome.inbox, FolderTally { moved: 1, failed: 0 });
        assert_eq!(outcome.sent, FolderTally { moved: 1, failed: 0 });
        assert_eq!(provider.subjects_in("a@b.com (2023)", "Inbox"), vec!["in 2023"]);
        assert_eq!(provider.subjects_in("a@b.com (2023)", "Sent Items"), vec!["sent 2023"]);
        assert_eq!(provider.subjects_in("a@b.com", "Inbox"), vec!["in 2024"]);
        assert_eq!(provider.subjects_in("a@b.com", "Sent Items"), vec!["undated"]);
    }

    #[test]
    fn dry_run_counts_but_moves_nothing() {
        let provider = seeded();
        let mut dry = plan("a@b.com", "a@b.com (2023)");
        dry.dry_run = true;
        let outcome = run(&provider, &dry).unwrap();

        assert!(outcome.dry_run);
        assert_eq!(outcome.moved_total(), 2);
        assert!(provider.subjects_in("a@b.com (2023)", "Inbox").is_empty());
        assert_eq!(provider.subjects_in("a@b.com", "Inbox").len(), 2);
    }

    #[test]
    fn second_run_finds_nothing_left() {
        let provider = seeded();
        let the_plan = plan("a@b.com", "a@b.com (2023)");
        run(&provider, &the_plan).unwrap();
        let again = run(&provider, &the_plan).unwrap();

        assert_eq!(again.moved_total(), 0);
        assert_eq!(again.failed_total(), 0);
        assert_eq!(provider.subjects_in("a@b.com (2023)", "Inbox"), vec!["in 2023"]);
    }

    #[test]
    fn override_year_beats_the_destination_name() {
        let provider = seeded();
        let mut with_override = plan("a@b.com", "a@b.com (2023)");
        with_override.override_year = Some(2024);
        let outcome = run(&provider, &with_override).unwrap();

        assert_eq!(outcome.year, 2024);
        assert_eq!(provider.subjects_in("a@b.com (2023)", "Inbox"), vec!["in 2024"]);
    }

    #[test]
    fn override_year_allows_a_yearless_destination() {
        let provider = seeded();
        provider.add_store("holding");
        let mut with_override = plan("a@b.com", "holding");
        with_override.override_year = Some(2023);

        let outcome = run(&provider, &with_override).unwrap();
        assert_eq!(outcome.moved_total(), 2);
    }

    #[test]
    fn yearless_destination_without_override_is_rejected() {
        let provider = seeded();
        provider.add_store("holding");
        let error = run(&provider, &plan("a@b.com", "holding")).unwrap_err();

        assert!(matches!(error, Error::YearNotFound { .. }));
        assert_eq!(error.title(), "Year Not Found");
        // Nothing moved.
        assert_eq!(provider.subjects_in("a@b.com", "Inbox").len(), 2);
    }

    #[test]
    fn unknown_destination_store_is_a_resolution_error() {
        let provider = seeded();
        let error = run(&provider, &plan("a@b.com", "nope (2023)")).unwrap_err();
        assert!(matches!(error, Error::FolderResolution { .. }));
    }

    #[test]
    fn canonical_folders_are_created_even_for_a_dry_run() {
        let provider = seeded();
        provider.add_bare_store("bare (2023)");
        let mut dry = plan("a@b.com", "bare (2023)");
        dry.dry_run = true;
        run(&provider, &dry).unwrap();

        let session = provider.connect().unwrap();
        let store = session.store("bare (2023)").unwrap();
        assert!(store.folder("Inbox").is_ok());
        assert!(store.folder("Sent Items").is_ok());
    }

    #[test]
    fn failed_items_are_counted_and_stay_put() {
        let provider = seeded();
        provider.reject_moves("a@b.com (2023)", "Inbox");
        let outcome = run(&provider, &plan("a@b.com", "a@b.com (2023)")).unwrap();

        assert_eq!(outcome.inbox, FolderTally { moved: 0, failed: 1 });
        assert_eq!(outcome.sent, FolderTally { moved: 1, failed: 0 });
        assert_eq!(provider.subjects_in("a@b.com", "Inbox").len(), 2);
    }

    #[test]
    fn cancellation_short_circuits_the_run() {
        let provider = seeded();
        let cancel = CancelToken::new();
        cancel.cancel();
        let session = provider.connect().unwrap();
        let outcome = execute(
            session.as_ref(),
            &plan("a@b.com", "a@b.com (2023)"),
            &StatusFeed::default(),
            &ActivityLog::discard(),
            &cancel,
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.moved_total(), 0);
        assert_eq!(provider.subjects_in("a@b.com", "Inbox").len(), 2);
    }
}
