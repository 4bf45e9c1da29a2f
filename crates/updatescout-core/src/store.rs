// Filter state persistence
//
// Resolution is pure; callers decide when to save. Anything that can hold
// a FilterState implements `FilterStore`.
use crate::resolve::FilterState;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

#[cfg_attr(test, mockall::automock)]
pub trait FilterStore {
    fn load(&self) -> Result<FilterState>;
    fn save(&self, state: &FilterState) -> Result<()>;
}

/// Load stored state, replacing anything unreadable with an empty state
pub fn load_state_or_default(store: &dyn FilterStore) -> FilterState {
    match store.load() {
        Ok(state) => state,
        Err(e) => {
            warn!("Stored filter state unusable, starting from defaults: {}", e);
            FilterState::default()
        }
    }
}

/// Pretty-printed JSON on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<data_dir>/updatescout/filters.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| Error::StorageError("Could not find data directory".into()))?
            .join("updatescout");
        Ok(dir.join("filters.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilterStore for JsonFileStore {
    fn load(&self) -> Result<FilterState> {
        if !self.path.exists() {
            // First run
            return Ok(FilterState::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&contents).map_err(|e| {
            Error::StorageError(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(state)
    }

    fn save(&self, state: &FilterState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, contents)?;
        debug!("Saved filter state to {}", self.path.display());
        Ok(())
    }
}

/// Keeps state in memory; handy for tests and one-shot runs
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<FilterState>,
}

impl InMemoryStore {
    pub fn new(state: FilterState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl FilterStore for InMemoryStore {
    fn load(&self) -> Result<FilterState> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| Error::StorageError("In-memory store poisoned".into()))
    }

    fn save(&self, state: &FilterState) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| Error::StorageError("In-memory store poisoned".into()))?;
        *guard = state.clone();
        Ok(())
    }
}
