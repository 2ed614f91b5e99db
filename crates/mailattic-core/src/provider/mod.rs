//! Provider seam between the engine and a concrete mail-store backend.
//!
//! The engine only ever talks to stores through the traits in this module.
//! A backend supplies a [`Connect`] factory; everything else is reached
//! through the session it produces. Sessions and the handles they hand out
//! are not required to be `Send`, so each engine worker establishes its own
//! session on the thread it runs on.

use std::any::Any;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

pub mod memory;

/// Subfolders every store must expose before it can take part in a move.
///
/// Order matters: operations that walk both folders report their results
/// in this order.
pub const CANONICAL_FOLDERS: [&str; 2] = ["Inbox", "Sent Items"];

/// A specialized [`Result`] type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by a mail-store backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A session could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// No store with the given display name exists in the session.
    #[error("store '{0}' not found")]
    StoreNotFound(String),

    /// A named subfolder does not exist in the store.
    #[error("folder '{folder}' not found in store '{store}'")]
    FolderNotFound {
        /// Store display name.
        store: String,
        /// Subfolder name that was looked up.
        folder: String,
    },

    /// A subfolder could not be created.
    #[error("could not create folder '{folder}' in store '{store}': {reason}")]
    FolderCreate {
        /// Store display name.
        store: String,
        /// Subfolder name that was being created.
        folder: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A new store could not be created at the requested path.
    #[error("could not create store at {path:?}: {reason}")]
    StoreCreate {
        /// Path the backend was asked to create the store at.
        path: PathBuf,
        /// Backend-specific failure description.
        reason: String,
    },

    /// An existing store could not be renamed.
    #[error("could not rename store '{store}': {reason}")]
    StoreRename {
        /// Display name of the store being renamed.
        store: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A store or folder could not be enumerated.
    #[error("could not enumerate {unit}: {reason}")]
    Enumeration {
        /// Description of the unit being listed, e.g. `"store 'a' > Inbox"`.
        unit: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A single item could not be relocated.
    #[error("could not move item '{subject}': {reason}")]
    ItemMove {
        /// Subject line of the item, for logging.
        subject: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A handle from a different backend was passed to this one.
    #[error("handle belongs to a different provider")]
    ForeignHandle,

    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single mail item inside a folder.
pub trait MailItem {
    /// When the item was sent, if the backend knows it.
    fn sent_at(&self) -> Option<NaiveDateTime>;

    /// When the item was received, if the backend knows it.
    fn received_at(&self) -> Option<NaiveDateTime>;

    /// Subject line, used for activity logging and display only.
    fn subject(&self) -> String;

    /// Relocates this item into `destination`.
    ///
    /// The destination must have been produced by the same backend as the
    /// item itself.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ForeignHandle`] when `destination` comes
    /// from another backend, or [`ProviderError::ItemMove`] when the
    /// relocation itself fails.
    fn move_to(&self, destination: &dyn MailFolder) -> ProviderResult<()>;
}

/// A subfolder of a store.
pub trait MailFolder {
    /// Folder display name.
    fn name(&self) -> String;

    /// A point-in-time snapshot of the items currently in this folder.
    ///
    /// Callers iterate the returned snapshot; mutations performed while
    /// iterating do not disturb it.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder contents cannot be listed.
    fn items(&self) -> ProviderResult<Vec<Box<dyn MailItem>>>;

    /// Downcast support so a backend can recognize its own folder handles.
    fn as_any(&self) -> &dyn Any;
}

/// A top-level mail store holding subfolders.
pub trait MailStore {
    /// Store display name, as shown to the user.
    fn name(&self) -> String;

    /// Looks up a direct subfolder by name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::FolderNotFound`] when no such subfolder
    /// exists.
    fn folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>>;

    /// Creates a direct subfolder.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::FolderCreate`] when the folder already
    /// exists or cannot be created.
    fn add_folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>>;

    /// Downcast support so a backend can recognize its own store handles.
    fn as_any(&self) -> &dyn Any;
}

/// An open connection to a mail backend.
pub trait MailSession {
    /// Every store currently attached to the session, in backend order.
    ///
    /// # Errors
    ///
    /// Returns an error when the store list cannot be enumerated.
    fn list_stores(&self) -> ProviderResult<Vec<Box<dyn MailStore>>>;

    /// Looks up a store by display name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::StoreNotFound`] when no store carries the
    /// given name.
    fn store(&self, name: &str) -> ProviderResult<Box<dyn MailStore>>;

    /// Creates a new, empty store backed by `path` and attaches it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::StoreCreate`] when the backing path exists
    /// already or cannot be created.
    fn create_store(&self, path: &Path) -> ProviderResult<Box<dyn MailStore>>;

    /// Gives a store a new display name, returning the renamed handle.
    ///
    /// Renaming a store to the name it already carries is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ForeignHandle`] for handles from another
    /// backend and [`ProviderError::StoreRename`] when the rename fails.
    fn rename_store(
        &self,
        store: &dyn MailStore,
        new_name: &str,
    ) -> ProviderResult<Box<dyn MailStore>>;

    /// Directory new store files are placed in by default.
    fn default_storage_path(&self) -> PathBuf;
}

/// Factory that opens sessions for engine workers.
///
/// The factory crosses thread boundaries; the sessions it produces do not
/// have to.
pub trait Connect: Send + Sync {
    /// Opens a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Connection`] when the backend is not
    /// reachable.
    fn connect(&self) -> ProviderResult<Box<dyn MailSession>>;
}
