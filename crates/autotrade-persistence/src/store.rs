//! JSON document stores.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use autotrade_core::{TradingSettings, WatchlistTable};

use crate::error::PersistenceResult;

/// File name of the persisted watchlist.
pub const WATCHLIST_FILE: &str = "watchlist.json";

/// File name of the persisted trading settings.
pub const SETTINGS_FILE: &str = "settings.json";

/// Storage for the engine's durable state.
pub trait PersistenceStore {
    /// Load the watchlist. `None` when nothing was saved yet.
    fn load_watchlist(&self) -> PersistenceResult<Option<WatchlistTable>>;

    fn save_watchlist(&self, table: &WatchlistTable) -> PersistenceResult<()>;

    /// Load the trading settings. `None` when nothing was saved yet.
    fn load_settings(&self) -> PersistenceResult<Option<TradingSettings>>;

    fn save_settings(&self, settings: &TradingSettings) -> PersistenceResult<()>;
}

/// One JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonFileStore<T> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is `Ok(None)`.
    pub fn load(&self) -> PersistenceResult<Option<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted document");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the document atomically.
    pub fn save(&self, doc: &T) -> PersistenceResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_vec_pretty(doc)?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = json.len(), "Document saved");
        Ok(())
    }
}

/// Watchlist and settings stored as two JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    watchlist: JsonFileStore<WatchlistTable>,
    settings: JsonFileStore<TradingSettings>,
}

impl FilePersistence {
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        info!(data_dir = %dir.display(), "File persistence configured");
        Self {
            watchlist: JsonFileStore::new(dir.join(WATCHLIST_FILE)),
            settings: JsonFileStore::new(dir.join(SETTINGS_FILE)),
        }
    }
}

impl PersistenceStore for FilePersistence {
    fn load_watchlist(&self) -> PersistenceResult<Option<WatchlistTable>> {
        self.watchlist.load()
    }

    fn save_watchlist(&self, table: &WatchlistTable) -> PersistenceResult<()> {
        self.watchlist.save(table)
    }

    fn load_settings(&self) -> PersistenceResult<Option<TradingSettings>> {
        self.settings.load()
    }

    fn save_settings(&self, settings: &TradingSettings) -> PersistenceResult<()> {
        self.settings.save(settings)
    }
}
