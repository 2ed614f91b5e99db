//! # mailattic-core
//!
//! Core engine for the `mailattic` mail-archive organizer.
//!
//! This crate provides:
//! - Store display-name conventions (account and year parsing)
//! - Effective-date classification of mail items
//! - Year-targeted moves between archive stores
//! - Missing-archive detection and provisioning
//! - An aggregate scan of every store by folder and year
//! - A command engine that serializes operations on worker threads
//!
//! Concrete mail backends plug in through the traits in [`provider`]; an
//! in-memory backend ships with the crate for tests and demos.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod activity;
pub mod catalog;
pub mod classify;
pub mod clock;
pub mod engine;
mod error;
pub mod mover;
pub mod naming;
pub mod provider;
pub mod provision;
pub mod scan;

pub use activity::ActivityLog;
pub use clock::{FixedToday, SystemToday, Today};
pub use engine::{CancelToken, Command, CommandOutcome, Engine, StatusFeed};
pub use error::{Error, Result};
pub use mover::{FolderTally, MoveOutcome, MovePlan};
pub use naming::{StoreName, is_archivable, normalize, year_of};
pub use provider::{
    CANONICAL_FOLDERS, Connect, MailFolder, MailItem, MailSession, MailStore, ProviderError,
    ProviderResult,
};
pub use provision::{MIN_ARCHIVE_YEAR, ProvisionReport, YearOutcome, YearProvision};
pub use scan::{ScanReport, ScanRow, SkippedUnit};
