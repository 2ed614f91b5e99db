//! In-memory backend used by tests and the demo mode.
//!
//! Stores, folders and items live in a single mutex-guarded table shared by
//! every handle the backend hands out. Fixture methods on
//! [`MemoryProvider`] seed state and inject faults; the trait impls then
//! behave like any other backend.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use super::{
    CANONICAL_FOLDERS, Connect, MailFolder, MailItem, MailSession, MailStore, ProviderError,
    ProviderResult,
};

#[derive(Debug, Default)]
struct State {
    stores: Vec<StoreData>,
    next_item: u64,
    fail_store_creation: bool,
}

#[derive(Debug)]
struct StoreData {
    name: String,
    folders: Vec<FolderData>,
}

#[derive(Debug)]
struct FolderData {
    name: String,
    items: Vec<ItemData>,
    fail_enumeration: bool,
    reject_moves: bool,
}

impl FolderData {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
            fail_enumeration: false,
            reject_moves: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ItemData {
    id: u64,
    subject: String,
    sent: Option<NaiveDateTime>,
    received: Option<NaiveDateTime>,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl State {
    fn store_mut(&mut self, name: &str) -> Option<&mut StoreData> {
        self.stores.iter_mut().find(|s| s.name == name)
    }

    fn folder_mut(&mut self, store: &str, folder: &str) -> Option<&mut FolderData> {
        self.store_mut(store)?.folders.iter_mut().find(|f| f.name == folder)
    }
}

/// Backend whose stores exist only in memory.
///
/// Cloning is cheap and every clone shares the same state, so a test can
/// keep a provider handle around to inspect the effects of engine runs.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    state: Shared,
    storage_path: PathBuf,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            storage_path: PathBuf::from("/memory/archives"),
        }
    }

    /// Chainable form of [`add_store`](Self::add_store) for fixture setup.
    #[must_use]
    pub fn with_store(self, name: &str) -> Self {
        self.add_store(name);
        self
    }

    /// Adds a store that already has both canonical subfolders.
    pub fn add_store(&self, name: &str) {
        let mut state = lock(&self.state);
        if state.store_mut(name).is_some() {
            return;
        }
        state.stores.push(StoreData {
            name: name.to_string(),
            folders: CANONICAL_FOLDERS.iter().map(|f| FolderData::new(f)).collect(),
        });
    }

    /// Adds a store with no subfolders at all.
    pub fn add_bare_store(&self, name: &str) {
        let mut state = lock(&self.state);
        if state.store_mut(name).is_some() {
            return;
        }
        state.stores.push(StoreData { name: name.to_string(), folders: Vec::new() });
    }

    /// Places a message in `store`/`folder`, creating both as needed.
    pub fn add_message(
        &self,
        store: &str,
        folder: &str,
        subject: &str,
        sent: Option<NaiveDateTime>,
        received: Option<NaiveDateTime>,
    ) {
        let mut state = lock(&self.state);
        let id = state.next_item;
        state.next_item += 1;
        if state.store_mut(store).is_none() {
            state.stores.push(StoreData { name: store.to_string(), folders: Vec::new() });
        }
        let Some(data) = state.store_mut(store) else { return };
        if !data.folders.iter().any(|f| f.name == folder) {
            data.folders.push(FolderData::new(folder));
        }
        if let Some(target) = data.folders.iter_mut().find(|f| f.name == folder) {
            target.items.push(ItemData { id, subject: subject.to_string(), sent, received });
        }
    }

    /// Makes item listing fail for one folder.
    pub fn fail_enumeration(&self, store: &str, folder: &str) {
        let mut state = lock(&self.state);
        if let Some(data) = state.folder_mut(store, folder) {
            data.fail_enumeration = true;
        }
    }

    /// Makes every move into one folder fail.
    pub fn reject_moves(&self, store: &str, folder: &str) {
        let mut state = lock(&self.state);
        if let Some(data) = state.folder_mut(store, folder) {
            data.reject_moves = true;
        }
    }

    /// Makes every subsequent store creation fail.
    pub fn fail_store_creation(&self) {
        lock(&self.state).fail_store_creation = true;
    }

    /// Subject lines currently sitting in `store`/`folder`, in order.
    #[must_use]
    pub fn subjects_in(&self, store: &str, folder: &str) -> Vec<String> {
        let mut state = lock(&self.state);
        state
            .folder_mut(store, folder)
            .map(|f| f.items.iter().map(|i| i.subject.clone()).collect())
            .unwrap_or_default()
    }

    /// Display names of every store, in backend order.
    #[must_use]
    pub fn store_names(&self) -> Vec<String> {
        lock(&self.state).stores.iter().map(|s| s.name.clone()).collect()
    }
}

impl Connect for MemoryProvider {
    fn connect(&self) -> ProviderResult<Box<dyn MailSession>> {
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            storage_path: self.storage_path.clone(),
        }))
    }
}

struct MemorySession {
    state: Shared,
    storage_path: PathBuf,
}

impl MailSession for MemorySession {
    fn list_stores(&self) -> ProviderResult<Vec<Box<dyn MailStore>>> {
        let state = lock(&self.state);
        Ok(state
            .stores
            .iter()
            .map(|s| {
                Box::new(MemoryStore { state: Arc::clone(&self.state), name: s.name.clone() })
                    as Box<dyn MailStore>
            })
            .collect())
    }

    fn store(&self, name: &str) -> ProviderResult<Box<dyn MailStore>> {
        let mut state = lock(&self.state);
        if state.store_mut(name).is_none() {
            return Err(ProviderError::StoreNotFound(name.to_string()));
        }
        Ok(Box::new(MemoryStore { state: Arc::clone(&self.state), name: name.to_string() }))
    }

    fn create_store(&self, path: &Path) -> ProviderResult<Box<dyn MailStore>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProviderError::StoreCreate {
                path: path.to_path_buf(),
                reason: "path has no final component".to_string(),
            })?;
        let mut state = lock(&self.state);
        if state.fail_store_creation {
            return Err(ProviderError::StoreCreate {
                path: path.to_path_buf(),
                reason: "store creation failure injected by test".to_string(),
            });
        }
        if state.store_mut(&name).is_some() {
            return Err(ProviderError::StoreCreate {
                path: path.to_path_buf(),
                reason: "store already exists".to_string(),
            });
        }
        state.stores.push(StoreData { name: name.clone(), folders: Vec::new() });
        Ok(Box::new(MemoryStore { state: Arc::clone(&self.state), name }))
    }

    fn rename_store(
        &self,
        store: &dyn MailStore,
        new_name: &str,
    ) -> ProviderResult<Box<dyn MailStore>> {
        let handle = store
            .as_any()
            .downcast_ref::<MemoryStore>()
            .ok_or(ProviderError::ForeignHandle)?;
        if !Arc::ptr_eq(&handle.state, &self.state) {
            return Err(ProviderError::ForeignHandle);
        }
        let mut state = lock(&self.state);
        if new_name != handle.name && state.store_mut(new_name).is_some() {
            return Err(ProviderError::StoreRename {
                store: handle.name.clone(),
                reason: format!("a store named '{new_name}' already exists"),
            });
        }
        let Some(data) = state.store_mut(&handle.name) else {
            return Err(ProviderError::StoreNotFound(handle.name.clone()));
        };
        data.name = new_name.to_string();
        Ok(Box::new(MemoryStore { state: Arc::clone(&self.state), name: new_name.to_string() }))
    }

    fn default_storage_path(&self) -> PathBuf {
        self.storage_path.clone()
    }
}

struct MemoryStore {
    state: Shared,
    name: String,
}

impl MailStore for MemoryStore {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>> {
        let mut state = lock(&self.state);
        if state.folder_mut(&self.name, name).is_none() {
            return Err(ProviderError::FolderNotFound {
                store: self.name.clone(),
                folder: name.to_string(),
            });
        }
        Ok(Box::new(MemoryFolder {
            state: Arc::clone(&self.state),
            store: self.name.clone(),
            name: name.to_string(),
        }))
    }

    fn add_folder(&self, name: &str) -> ProviderResult<Box<dyn MailFolder>> {
        let mut state = lock(&self.state);
        let Some(store) = state.store_mut(&self.name) else {
            return Err(ProviderError::StoreNotFound(self.name.clone()));
        };
        if store.folders.iter().any(|f| f.name == name) {
            return Err(ProviderError::FolderCreate {
                store: self.name.clone(),
                folder: name.to_string(),
                reason: "folder already exists".to_string(),
            });
        }
        store.folders.push(FolderData::new(name));
        Ok(Box::new(MemoryFolder {
            state: Arc::clone(&self.state),
            store: self.name.clone(),
            name: name.to_string(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MemoryFolder {
    state: Shared,
    store: String,
    name: String,
}

impl MailFolder for MemoryFolder {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn items(&self) -> ProviderResult<Vec<Box<dyn MailItem>>> {
        let mut state = lock(&self.state);
        let Some(data) = state.folder_mut(&self.store, &self.name) else {
            return Err(ProviderError::FolderNotFound {
                store: self.store.clone(),
                folder: self.name.clone(),
            });
        };
        if data.fail_enumeration {
            return Err(ProviderError::Enumeration {
                unit: format!("store '{}' > {}", self.store, self.name),
                reason: "enumeration failure injected by test".to_string(),
            });
        }
        let items = data.items.clone();
        drop(state);
        Ok(items
            .into_iter()
            .map(|data| {
                Box::new(MemoryItem { state: Arc::clone(&self.state), data }) as Box<dyn MailItem>
            })
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MemoryItem {
    state: Shared,
    data: ItemData,
}

impl MailItem for MemoryItem {
    fn sent_at(&self) -> Option<NaiveDateTime> {
        self.data.sent
    }

    fn received_at(&self) -> Option<NaiveDateTime> {
        self.data.received
    }

    fn subject(&self) -> String {
        self.data.subject.clone()
    }

    fn move_to(&self, destination: &dyn MailFolder) -> ProviderResult<()> {
        let dest = destination
            .as_any()
            .downcast_ref::<MemoryFolder>()
            .ok_or(ProviderError::ForeignHandle)?;
        if !Arc::ptr_eq(&dest.state, &self.state) {
            return Err(ProviderError::ForeignHandle);
        }
        let mut state = lock(&self.state);

        // Validate the destination before touching the source so a refused
        // move leaves the item exactly where it was.
        let Some(target) = state.folder_mut(&dest.store, &dest.name) else {
            return Err(ProviderError::FolderNotFound {
                store: dest.store.clone(),
                folder: dest.name.clone(),
            });
        };
        if target.reject_moves {
            return Err(ProviderError::ItemMove {
                subject: self.data.subject.clone(),
                reason: "destination folder rejected the item".to_string(),
            });
        }

        let mut taken = None;
        'search: for store in &mut state.stores {
            for folder in &mut store.folders {
                if let Some(pos) = folder.items.iter().position(|i| i.id == self.data.id) {
                    taken = Some(folder.items.remove(pos));
                    break 'search;
                }
            }
        }
        let Some(item) = taken else {
            return Err(ProviderError::ItemMove {
                subject: self.data.subject.clone(),
                reason: "item no longer present in its source folder".to_string(),
            });
        };

        let Some(folder) = state.folder_mut(&dest.store, &dest.name) else {
            return Err(ProviderError::FolderNotFound {
                store: dest.store.clone(),
                folder: dest.name.clone(),
            });
        };
        folder.items.push(item);
        Ok(())
    }
}
