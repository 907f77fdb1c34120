//! JSON-file entity store.
//!
//! # Responsibility
//! - Read `engineers.json`, `projects.json` and `allocations.json` from one
//!   data directory.
//! - Rewrite `allocations.json` atomically on save.
//!
//! # Invariants
//! - Saves write a sibling temp file and rename it over the target, so a
//!   crash mid-write never leaves a truncated collection behind.
//! - Missing or malformed files are storage errors, never empty collections.

use super::{check_allocations, EntityStore, StoreError, StoreResult};
use crate::model::allocation::Allocation;
use crate::model::engineer::Engineer;
use crate::model::project::Project;
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

pub const ENGINEERS_FILE: &str = "engineers.json";
pub const PROJECTS_FILE: &str = "projects.json";
pub const ALLOCATIONS_FILE: &str = "allocations.json";

/// Entity store backed by pretty-printed JSON arrays in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Binds the store to an existing data directory. Nothing is read yet.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Creates `data_dir` and any missing collection file as `[]`.
    ///
    /// Existing files are left untouched.
    pub fn init(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(data_dir);
        std::fs::create_dir_all(&store.data_dir).map_err(|source| StoreError::Io {
            path: store.data_dir.clone(),
            source,
        })?;
        for file in [ENGINEERS_FILE, PROJECTS_FILE, ALLOCATIONS_FILE] {
            let path = store.data_dir.join(file);
            if !path.exists() {
                write_atomic::<Engineer>(&path, &[])?;
            }
        }
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Overwrites `engineers.json`. Used by seeding and import flows only.
    pub fn save_engineers(&self, engineers: &[Engineer]) -> StoreResult<()> {
        write_atomic(&self.data_dir.join(ENGINEERS_FILE), engineers)
    }

    /// Overwrites `projects.json`. Used by seeding and import flows only.
    pub fn save_projects(&self, projects: &[Project]) -> StoreResult<()> {
        write_atomic(&self.data_dir.join(PROJECTS_FILE), projects)
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Vec<T>> {
        let started_at = Instant::now();
        let path = self.data_dir.join(file);
        let result = read_collection(&path);
        match &result {
            Ok(items) => info!(
                "event=store_load module=store status=ok backend=json file={file} count={} duration_ms={}",
                items.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_load module=store status=error backend=json file={file} error={err}"
            ),
        }
        result
    }
}

impl EntityStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn load_engineers(&self) -> StoreResult<Vec<Engineer>> {
        self.load(ENGINEERS_FILE)
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        self.load(PROJECTS_FILE)
    }

    fn load_allocations(&self) -> StoreResult<Vec<Allocation>> {
        let allocations: Vec<Allocation> = self.load(ALLOCATIONS_FILE)?;
        check_allocations(&allocations)?;
        Ok(allocations)
    }

    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = write_atomic(&self.data_dir.join(ALLOCATIONS_FILE), allocations);
        match &result {
            Ok(()) => info!(
                "event=store_save module=store status=ok backend=json count={} duration_ms={}",
                allocations.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!("event=store_save module=store status=error backend=json error={err}"),
        }
        result
    }
}

fn read_collection<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.write_all(b"\n").map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
