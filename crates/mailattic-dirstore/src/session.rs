//! Session establishment over a storage root.

use std::fs;
use std::path::{Path, PathBuf};

use mailattic_core::provider::{
    Connect, MailSession, MailStore, ProviderError, ProviderResult,
};

use crate::store::DirStore;

/// Connection factory for a directory-tree backend.
///
/// Every direct subdirectory of the storage root is a store; its display
/// name is the directory name. Sessions hand out handles rooted at the
/// same path, so a connector can be cloned freely across workers.
#[derive(Debug, Clone)]
pub struct DirConnector {
    root: PathBuf,
}

impl DirConnector {
    /// A connector over `root`. The directory must exist by the time
    /// [`Connect::connect`] is called.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root this connector opens.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Connect for DirConnector {
    fn connect(&self) -> ProviderResult<Box<dyn MailSession>> {
        if !self.root.is_dir() {
            return Err(ProviderError::Connection(format!(
                "storage root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(Box::new(DirSession { root: self.root.clone() }))
    }
}

struct DirSession {
    root: PathBuf,
}

impl MailSession for DirSession {
    fn list_stores(&self) -> ProviderResult<Vec<Box<dyn MailStore>>> {
        let entries = fs::read_dir(&self.root).map_err(|error| ProviderError::Enumeration {
            unit: "store list".to_string(),
            reason: error.to_string(),
        })?;
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| ProviderError::Enumeration {
                unit: "store list".to_string(),
                reason: error.to_string(),
            })?;
            let path = entry.path();
            if !path.is_dir() || is_hidden_dir(&path) {
                continue;
            }
            paths.push(path);
        }
        paths.sort();
        Ok(paths.into_iter().map(|path| Box::new(DirStore { path }) as Box<dyn MailStore>).collect())
    }

    fn store(&self, name: &str) -> ProviderResult<Box<dyn MailStore>> {
        let path = self.root.join(name);
        if !path.is_dir() {
            return Err(ProviderError::StoreNotFound(name.to_string()));
        }
        Ok(Box::new(DirStore { path }))
    }

    fn create_store(&self, path: &Path) -> ProviderResult<Box<dyn MailStore>> {
        if path.exists() {
            return Err(ProviderError::StoreCreate {
                path: path.to_path_buf(),
                reason: "path already exists".to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| ProviderError::StoreCreate {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;
        }
        fs::create_dir(path).map_err(|error| ProviderError::StoreCreate {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Ok(Box::new(DirStore { path: path.to_path_buf() }))
    }

    fn rename_store(
        &self,
        store: &dyn MailStore,
        new_name: &str,
    ) -> ProviderResult<Box<dyn MailStore>> {
        let handle = store
            .as_any()
            .downcast_ref::<DirStore>()
            .ok_or(ProviderError::ForeignHandle)?;
        if handle.path.file_name().is_some_and(|n| n == new_name) {
            return Ok(Box::new(DirStore { path: handle.path.clone() }));
        }
        let parent = handle.path.parent().unwrap_or(self.root.as_path());
        let target = parent.join(new_name);
        if target.exists() {
            return Err(ProviderError::StoreRename {
                store: store.name(),
                reason: format!("a store named '{new_name}' already exists"),
            });
        }
        fs::rename(&handle.path, &target).map_err(|error| ProviderError::StoreRename {
            store: store.name(),
            reason: error.to_string(),
        })?;
        Ok(Box::new(DirStore { path: target }))
    }

    fn default_storage_path(&self) -> PathBuf {
        self.root.clone()
    }
}

fn is_hidden_dir(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'))
}
