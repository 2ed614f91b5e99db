//! Store, folder and item handles over the directory tree.

use std::any::Any;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::debug;

use mailattic_core::provider::{MailFolder, MailItem, MailStore, ProviderError, ProviderResult};

use crate::message;

pub(crate) struct DirStore {
    pub(crate) path: PathBuf,
}

impl DirStore {
    fn display_name(&self) -> String {
        self.path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }
}

impl MailStore for DirStore {
    fn name(&self) -> String {
        self.display_name()
    }

    fn folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>> {
        let path = self.path.join(name);
        if !path.is_dir() {
            return Err(ProviderError::FolderNotFound {
                store: self.display_name(),
                folder: name.to_string(),
            });
        }
        Ok(Box::new(DirFolder { path, store: self.display_name(), name: name.to_string() }))
    }

    fn add_folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>> {
        let path = self.path.join(name);
        if path.exists() {
            return Err(ProviderError::FolderCreate {
                store: self.display_name(),
                folder: name.to_string(),
                reason: "folder already exists".to_string(),
            });
        }
        fs::create_dir(&path).map_err(|error| ProviderError::FolderCreate {
            store: self.display_name(),
            folder: name.to_string(),
            reason: error.to_string(),
        })?;
        Ok(Box::new(DirFolder { path, store: self.display_name(), name: name.to_string() }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct DirFolder {
    pub(crate) path: PathBuf,
    store: String,
    name: String,
}

impl MailFolder for DirFolder {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn items(&self) -> ProviderResult<Vec<Box<dyn MailItem>>> {
        let unit = format!("store '{}' > {}", self.store, self.name);
        let entries = fs::read_dir(&self.path).map_err(|error| ProviderError::Enumeration {
            unit: unit.clone(),
            reason: error.to_string(),
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| ProviderError::Enumeration {
                unit: unit.clone(),
                reason: error.to_string(),
            })?;
            let path = entry.path();
            if !path.is_file() || is_hidden(&path) {
                continue;
            }
            files.push(path);
        }
        files.sort();

        let mut items: Vec<Box<dyn MailItem>> = Vec::new();
        for path in files {
            match message::read_headers(&path) {
                Ok(headers) => {
                    let subject = headers.subject.unwrap_or_else(|| file_stem(&path));
                    let received = modified_at(&path);
                    items.push(Box::new(DirItem { path, sent: headers.sent, received, subject }));
                }
                Err(error) => {
                    debug!(file = %path.display(), %error, "skipping unreadable message file");
                }
            }
        }
        Ok(items)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct DirItem {
    path: PathBuf,
    sent: Option<NaiveDateTime>,
    received: Option<NaiveDateTime>,
    subject: String,
}

impl MailItem for DirItem {
    fn sent_at(&self) -> Option<NaiveDateTime> {
        self.sent
    }

    fn received_at(&self) -> Option<NaiveDateTime> {
        self.received
    }

    fn subject(&self) -> String {
        self.subject.clone()
    }

    fn move_to(&self, destination: &dyn MailFolder) -> ProviderResult<()> {
        let dest = destination
            .as_any()
            .downcast_ref::<DirFolder>()
            .ok_or(ProviderError::ForeignHandle)?;
        let file_name = self.path.file_name().ok_or_else(|| ProviderError::ItemMove {
            subject: self.subject.clone(),
            reason: "item path has no file name".to_string(),
        })?;
        move_file(&self.path, &dest.path.join(file_name)).map_err(|error| {
            ProviderError::ItemMove { subject: self.subject.clone(), reason: error.to_string() }
        })
    }
}

/// Relocates one file, falling back to copy-and-remove when a plain
/// rename cannot cross the boundary.
///
/// An existing destination file fails the move; silently replacing
/// another message is never acceptable.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    if to.exists() {
        return Err(io::Error::new(ErrorKind::AlreadyExists, "destination file already exists"));
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(error)
            if matches!(error.kind(), ErrorKind::CrossesDevices | ErrorKind::PermissionDenied) =>
        {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
        Err(error) => Err(error),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
}

fn modified_at(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn move_file_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.eml");
        let to = dir.path().join("b.eml");
        fs::write(&from, "one").unwrap();
        fs::write(&to, "two").unwrap();

        let error = move_file(&from, &to).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AlreadyExists);
        assert!(from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "two");
    }

    #[test]
    fn move_file_relocates_within_a_tree() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let from = dir.path().join("a.eml");
        fs::write(&from, "payload").unwrap();

        move_file(&from, &sub.join("a.eml")).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(sub.join("a.eml")).unwrap(), "payload");
    }

    #[test]
    fn moving_to_the_same_path_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.eml");
        fs::write(&path, "stay").unwrap();

        move_file(&path, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "stay");
    }

    #[test]
    fn hidden_files_are_not_items() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".keep"), "").unwrap();
        fs::write(dir.path().join("real.eml"), "Subject: real\n\n").unwrap();

        let folder = DirFolder {
            path: dir.path().to_path_buf(),
            store: "test".to_string(),
            name: "Inbox".to_string(),
        };
        let items = folder.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].subject(), "real");
    }
}
