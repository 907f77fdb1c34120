//! Store backend selection.
//!
//! Adapters resolve a [`StoreBackend`] from their own flags/environment and
//! hand it to [`open_store`]; the engine only ever sees the trait object.

use crate::store::json_store::JsonFileStore;
use crate::store::sqlite_store::SqliteEntityStore;
use crate::store::{EntityStore, StoreResult};
use log::info;
use std::path::PathBuf;

/// Default JSON data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Where engineers, projects and allocations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Three JSON files in one directory.
    Json { data_dir: PathBuf },
    /// One SQLite database file.
    Sqlite { db_path: PathBuf },
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Json {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl StoreBackend {
    /// Picks SQLite when a database path is given, JSON otherwise.
    pub fn resolve(data_dir: Option<PathBuf>, db_path: Option<PathBuf>) -> Self {
        match (db_path, data_dir) {
            (Some(db_path), _) => Self::Sqlite { db_path },
            (None, Some(data_dir)) => Self::Json { data_dir },
            (None, None) => Self::default(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Json { .. } => "json",
            Self::Sqlite { .. } => "sqlite",
        }
    }
}

/// Opens the configured backend.
///
/// JSON stores are not read until first use; SQLite files are created and
/// migrated immediately.
pub fn open_store(backend: &StoreBackend) -> StoreResult<Box<dyn EntityStore>> {
    let store: Box<dyn EntityStore> = match backend {
        StoreBackend::Json { data_dir } => Box::new(JsonFileStore::new(data_dir.clone())),
        StoreBackend::Sqlite { db_path } => Box::new(SqliteEntityStore::open(db_path)?),
    };
    info!(
        "event=store_open module=store status=ok backend={}",
        backend.label()
    );
    Ok(store)
}
