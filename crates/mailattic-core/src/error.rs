//! Error types for the core library.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that abort a whole engine operation.
///
/// Failures scoped to a single item, year or scan unit never surface
/// here; they are logged and counted inside the operation's report.
#[derive(Debug, Error)]
pub enum Error {
    /// A store or canonical subfolder required by the operation could not
    /// be resolved.
    #[error("could not resolve {what}: {source}")]
    FolderResolution {
        /// Description of what was being resolved, e.g. `"store 'a'"`.
        what: String,
        /// Underlying provider failure.
        source: ProviderError,
    },

    /// No target year: the destination name carries none and no override
    /// was given.
    #[error("no year in destination '{destination}' and no override year given")]
    YearNotFound {
        /// Destination store display name.
        destination: String,
    },

    /// Session-level provider failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A background worker did not run to completion.
    #[error("worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Short title for surfacing the error interactively, alongside the
    /// full message.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::FolderResolution { .. } => "Folder Error",
            Self::YearNotFound { .. } => "Year Not Found",
            Self::Provider(_) => "Provider Error",
            Self::Worker(_) => "Worker Error",
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
