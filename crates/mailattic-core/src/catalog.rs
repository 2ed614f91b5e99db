//! Store catalog: enumeration, destination filtering and canonical
//! subfolder upkeep.

use tracing::warn;

use crate::activity::ActivityLog;
use crate::naming;
use crate::provider::{CANONICAL_FOLDERS, MailSession, MailStore, ProviderResult};

/// Display names of every store in the session, sorted.
///
/// # Errors
///
/// Returns an error when the store list cannot be enumerated.
pub fn store_names(session: &dyn MailSession) -> ProviderResult<Vec<String>> {
    let mut names: Vec<String> = session.list_stores()?.iter().map(|s| s.name()).collect();
    names.sort();
    Ok(names)
}

/// Destination candidates for `source`, sorted.
///
/// With the filter enabled only stores of the same account family remain:
/// those whose normalized name starts with the normalized source name cut
/// off at its first `(`. With the filter disabled every store qualifies,
/// the source itself included either way.
#[must_use]
pub fn destination_candidates(
    source: &str,
    all_names: &[String],
    filter_enabled: bool,
) -> Vec<String> {
    let mut names: Vec<String> = if filter_enabled {
        let normalized = naming::normalize(source);
        let prefix = normalized.split('(').next().unwrap_or_default();
        all_names
            .iter()
            .filter(|name| naming::normalize(name).starts_with(prefix))
            .cloned()
            .collect()
    } else {
        all_names.to_vec()
    };
    names.sort();
    names
}

/// Makes sure both canonical subfolders exist in `store`, creating any
/// that are missing.
///
/// Creation failures are logged and left for the caller's next folder
/// lookup to surface; an unusable store must not halt a multi-store pass.
pub fn ensure_canonical_folders(store: &dyn MailStore, log: &ActivityLog) {
    for name in CANONICAL_FOLDERS {
        if store.folder(name).is_ok() {
            continue;
        }
        match store.add_folder(name) {
            Ok(_) => log.info(&format!("created missing folder '{name}' in '{}'", store.name())),
            Err(error) => {
                log.error(&format!(
                    "could not create folder '{name}' in '{}': {error}",
                    store.name()
                ));
                warn!(folder = name, store = %store.name(), %error, "folder creation failed");
            }
        }
    }
}
