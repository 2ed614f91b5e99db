//! Launch flags.

use std::path::PathBuf;

use clap::Parser;

/// Command-line flags for the console.
#[derive(Debug, Parser)]
#[command(name = "mailattic")]
#[command(author, version, about)]
pub struct Args {
    /// Root directory holding the archive stores.
    #[arg(required_unless_present = "demo")]
    pub root: Option<PathBuf>,
    /// Directory the activity log is written into.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Run against a seeded in-memory provider instead of a directory root.
    #[arg(long)]
    pub demo: bool,
}

impl Args {
    /// The activity log directory, defaulting to the user data directory.
    #[must_use]
    pub fn activity_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("mailattic")
        })
    }
}
