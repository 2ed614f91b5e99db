//! Missing-archive detection and creation.
//!
//! For a source store's account this works out which calendar years have
//! mail but no `<account> (<year>)` archive store yet, then creates one
//! per missing year. A year that fails to provision is recorded and the
//! loop moves on; archives are independent of each other.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::activity::ActivityLog;
use crate::catalog;
use crate::classify;
use crate::clock::Today;
use crate::engine::{CancelToken, StatusFeed};
use crate::error::{Error, Result};
use crate::naming::{self, StoreName};
use crate::provider::{CANONICAL_FOLDERS, MailSession, MailStore, ProviderResult};

/// Oldest year an archive store will be provisioned for. Anything below
/// this is assumed to be a clock artifact, not real mail.
pub const MIN_ARCHIVE_YEAR: i32 = 1980;

/// What happened for one candidate year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum YearOutcome {
    /// Dry run: the archive would have been created.
    WouldCreate,
    /// The archive store and its canonical subfolders now exist.
    Created,
    /// Creation failed; later years were still attempted.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// One candidate year and what was done about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearProvision {
    /// Calendar year the archive covers.
    pub year: i32,
    /// Display name the archive carries, `<account> (<year>)`.
    pub store_name: String,
    /// Result for this year.
    pub outcome: YearOutcome,
}

/// Outcome of one provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    /// Account the run provisioned for.
    pub account: String,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Candidate years in ascending order.
    pub provisions: Vec<YearProvision>,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Years that have mail in `source` but no archive store yet.
///
/// A store counts as an existing archive for the account when its
/// normalized name contains the normalized account and carries a
/// parenthesized year. Candidate years are clamped to
/// [`MIN_ARCHIVE_YEAR`]..=today and the source store's own year is never
/// a candidate.
///
/// Subfolders that cannot be enumerated are logged and skipped; year
/// detection works with whatever could be read.
pub fn missing_years(
    account: &str,
    source: &dyn MailStore,
    all_names: &[String],
    today: &dyn Today,
    log: &ActivityLog,
) -> BTreeSet<i32> {
    let normalized_account = naming::normalize(account);

    let mut existing = BTreeSet::new();
    for name in all_names {
        if naming::normalize(name).contains(&normalized_account)
            && let Some(year) = naming::year_of(name)
        {
            existing.insert(year);
        }
    }

    let mut observed = BTreeSet::new();
    for folder_name in CANONICAL_FOLDERS {
        let items = match source.folder(folder_name).and_then(|f| f.items()) {
            Ok(items) => items,
            Err(error) => {
                log.warn(&format!("year detection skipped {folder_name}: {error}"));
                continue;
            }
        };
        for item in items {
            if let Some(year) = classify::effective_year(item.as_ref()) {
                observed.insert(year);
            }
        }
    }

    let source_year = naming::year_of(&source.name());
    let current = today.year();
    observed
        .into_iter()
        .filter(|&year| {
            (MIN_ARCHIVE_YEAR..=current).contains(&year)
                && Some(year) != source_year
                && !existing.contains(&year)
        })
        .collect()
}

/// Detects and creates the missing yearly archives for `source_name`'s
/// account.
///
/// In dry-run mode nothing is created; the report lists what would be.
///
/// # Errors
///
/// Returns [`Error::FolderResolution`] when the source store cannot be
/// resolved. Per-year creation failures never surface here; they are
/// recorded in the report.
pub fn provision_missing(
    session: &dyn MailSession,
    source_name: &str,
    dry_run: bool,
    today: &dyn Today,
    status: &StatusFeed,
    log: &ActivityLog,
    cancel: &CancelToken,
) -> Result<ProvisionReport> {
    let source = session.store(source_name).map_err(|error| Error::FolderResolution {
        what: format!("store '{source_name}'"),
        source: error,
    })?;
    let account = StoreName::parse(source_name).account;

    status.set(format!("checking yearly archives for '{account}'"));
    log.info(&format!("checking for missing yearly archives, account '{account}'"));

    let all_names = catalog::store_names(session)?;
    let years = missing_years(&account, source.as_ref(), &all_names, today, log);
    log.info(&format!("years needing an archive: {years:?}"));

    let mut report =
        ProvisionReport { account: account.clone(), dry_run, provisions: Vec::new(), cancelled: false };

    for year in years {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let store_name = format!("{account} ({year})");
        let outcome = if dry_run {
            log.info(&format!("missing archive for {year}, would create '{store_name}'"));
            YearOutcome::WouldCreate
        } else {
            log.info(&format!("missing archive for {year}, creating '{store_name}'"));
            match provision_year(session, &store_name, log) {
                Ok(()) => YearOutcome::Created,
                Err(error) => {
                    log.error(&format!("could not create archive '{store_name}': {error}"));
                    warn!(year, %error, "archive provisioning failed");
                    YearOutcome::Failed { reason: error.to_string() }
                }
            }
        };
        report.provisions.push(YearProvision { year, store_name, outcome });
    }

    if report.cancelled {
        log.warn("archive provisioning cancelled before completion");
    }
    log.info(&format!("archive check finished: {} candidate years", report.provisions.len()));
    Ok(report)
}

fn provision_year(session: &dyn MailSession, store_name: &str, log: &ActivityLog) -> ProviderResult<()> {
    let path = session.default_storage_path().join(store_name);
    let store = session.create_store(&path)?;
    let store = session.rename_store(store.as_ref(), store_name)?;
    catalog::ensure_canonical_folders(store.as_ref(), log);
    Ok(())
}
