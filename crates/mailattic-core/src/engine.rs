//! Command controller.
//!
//! The engine owns the provider connection factory and runs every
//! operation on a blocking worker thread, one operation at a time.
//! Sessions are opened inside the worker, never shared across threads,
//! which keeps the provider traits free of `Send` bounds. While a worker
//! runs, a watch channel publishes coarse status text and a shared token
//! lets the interactive surface request cancellation; the worker checks
//! it between items, never mid-item.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use crate::activity::ActivityLog;
use crate::catalog;
use crate::clock::{SystemToday, Today};
use crate::error::{Error, Result};
use crate::mover::{self, MoveOutcome, MovePlan};
use crate::naming;
use crate::provider::Connect;
use crate::provision::{self, ProvisionReport};
use crate::scan::{self, ScanReport};

/// A user-triggered operation.
#[derive(Debug, Clone)]
pub enum Command {
    /// Count classifiable items in every store, by folder and year.
    ScanRequested,
    /// Move one year's items from a source store to a destination store.
    MoveRequested {
        /// Source store display name.
        source: String,
        /// Destination store display name.
        destination: String,
        /// Explicit target year, overriding the destination name.
        override_year: Option<i32>,
        /// Count matches without relocating anything.
        dry_run: bool,
    },
    /// Create missing yearly archives for a source store's account.
    ProvisionRequested {
        /// Source store display name.
        source: String,
        /// Report what would be created without creating it.
        dry_run: bool,
    },
}

/// What a completed command produced.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// Counts and skipped units from an aggregate scan.
    Scan(ScanReport),
    /// Per-folder tallies from a move run.
    Move(MoveOutcome),
    /// Per-year results from a provisioning run.
    Provision(ProvisionReport),
}

/// Cooperative cancellation flag.
///
/// Operations poll it at item and unit boundaries, so cancellation stops
/// work between items and never leaves a half-moved item behind.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the operation running right now.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Coarse status text published while an operation runs.
#[derive(Debug, Clone)]
pub struct StatusFeed {
    tx: watch::Sender<String>,
}

impl Default for StatusFeed {
    fn default() -> Self {
        let (tx, _) = watch::channel("idle".to_string());
        Self { tx }
    }
}

impl StatusFeed {
    /// A feed whose current text is `"idle"`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current status text.
    pub fn set(&self, message: impl Into<String>) {
        let _ = self.tx.send_replace(message.into());
    }

    /// A receiver that observes every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Runs commands against a mail provider, one at a time.
///
/// Commands arriving while one runs wait their turn; the permit queue is
/// fair, so they run in arrival order.
pub struct Engine {
    connector: Arc<dyn Connect>,
    log: Arc<ActivityLog>,
    today: Arc<dyn Today>,
    gate: Arc<Semaphore>,
    status: StatusFeed,
    cancel: CancelToken,
}

impl Engine {
    /// Builds an engine over a connection factory and an activity log.
    #[must_use]
    pub fn new(connector: Arc<dyn Connect>, log: Arc<ActivityLog>) -> Self {
        Self {
            connector,
            log,
            today: Arc::new(SystemToday),
            gate: Arc::new(Semaphore::new(1)),
            status: StatusFeed::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the calendar used for provisioning bounds.
    #[must_use]
    pub fn with_today(mut self, today: Arc<dyn Today>) -> Self {
        self.today = today;
        self
    }

    /// A receiver for the engine's status text.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    /// The token that cancels the currently running operation.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Display names of every store, sorted.
    ///
    /// Catalog queries are not gated; they stay fast while an operation
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be opened or the store
    /// list cannot be enumerated.
    pub async fn store_names(&self) -> Result<Vec<String>> {
        let connector = Arc::clone(&self.connector);
        run_worker(move || {
            let session = connector.connect()?;
            Ok(catalog::store_names(session.as_ref())?)
        })
        .await
    }

    /// Destination candidates for `source` under the family filter.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be opened or the store
    /// list cannot be enumerated.
    pub async fn destination_candidates(
        &self,
        source: String,
        filter_enabled: bool,
    ) -> Result<Vec<String>> {
        let connector = Arc::clone(&self.connector);
        run_worker(move || {
            let session = connector.connect()?;
            let names = catalog::store_names(session.as_ref())?;
            Ok(catalog::destination_candidates(&source, &names, filter_enabled))
        })
        .await
    }

    /// Runs one command to completion.
    ///
    /// The call returns once the operation has finished; concurrent calls
    /// are serialized. Every operation-level failure is written to the
    /// activity log before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::YearNotFound`] for a move with no resolvable
    /// year, [`Error::FolderResolution`] when stores or canonical
    /// subfolders are missing, and [`Error::Worker`] when the worker
    /// thread dies.
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome> {
        let permit = Arc::clone(&self.gate)
            .acquire_owned()
            .await
            .map_err(|e| Error::Worker(e.to_string()))?;
        self.cancel.reset();
        debug!(?command, "dispatching command");

        let result = self.run_command(command).await;
        if let Err(error) = &result {
            self.log.error(&format!("{}: {error}", error.title()));
            warn!(%error, "command failed");
        }
        self.status.set("idle");
        drop(permit);
        result
    }

    async fn run_command(&self, command: Command) -> Result<CommandOutcome> {
        // A move with no determinable year is doomed; fail it before a
        // worker ever spins up.
        if let Command::MoveRequested { destination, override_year: None, .. } = &command
            && naming::year_of(destination).is_none()
        {
            return Err(Error::YearNotFound { destination: destination.clone() });
        }

        let connector = Arc::clone(&self.connector);
        let log = Arc::clone(&self.log);
        let today = Arc::clone(&self.today);
        let status = self.status.clone();
        let cancel = self.cancel.clone();

        run_worker(move || {
            let session = connector.connect()?;
            match command {
                Command::ScanRequested => {
                    let report = scan::scan(session.as_ref(), &status, &log, &cancel)?;
                    Ok(CommandOutcome::Scan(report))
                }
                Command::MoveRequested { source, destination, override_year, dry_run } => {
                    let plan = MovePlan { source, destination, override_year, dry_run };
                    let outcome = mover::execute(session.as_ref(), &plan, &status, &log, &cancel)?;
                    Ok(CommandOutcome::Move(outcome))
                }
                Command::ProvisionRequested { source, dry_run } => {
                    let report = provision::provision_missing(
                        session.as_ref(),
                        &source,
                        dry_run,
                        today.as_ref(),
                        &status,
                        &log,
                        &cancel,
                    )?;
                    Ok(CommandOutcome::Provision(report))
                }
            }
        })
        .await
    }
}

async fn run_worker<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| Error::Worker(e.to_string()))?
}
