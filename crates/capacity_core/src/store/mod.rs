//! Entity store contracts and persistence backends.
//!
//! # Responsibility
//! - Define the whole-collection load/save contract the engine depends on.
//! - Keep file-format and SQL details out of the engine.
//!
//! # Invariants
//! - `save_allocations` replaces the entire allocation collection; a failed
//!   save leaves the previously stored collection intact.
//! - Load paths reject invalid persisted data instead of masking it.
//! - Loads preserve stored sequence order.

use crate::db::DbError;
use crate::model::allocation::{Allocation, AllocationValidationError};
use crate::model::engineer::Engineer;
use crate::model::project::Project;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod json_store;
pub mod memory_store;
pub mod sqlite_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level failure. Surfaced to callers unchanged; never retried.
#[derive(Debug)]
pub enum StoreError {
    /// Backing file could not be read, written or renamed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Backing file is not valid JSON for the expected collection.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// SQLite open/migrate/query failure.
    Db(DbError),
    /// Stored record violates a model invariant.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "storage I/O failed for `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "malformed data in `{}`: {source}", path.display())
            }
            Self::Db(err) => write!(f, "storage database error: {err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-collection persistence contract consumed by the allocation engine.
pub trait EntityStore {
    /// Short backend label used in log events.
    fn backend(&self) -> &'static str;
    fn load_engineers(&self) -> StoreResult<Vec<Engineer>>;
    fn load_projects(&self) -> StoreResult<Vec<Project>>;
    fn load_allocations(&self) -> StoreResult<Vec<Allocation>>;
    /// Overwrites the stored allocation collection with `allocations`.
    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()>;
}

impl<S: EntityStore + ?Sized> EntityStore for Box<S> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn load_engineers(&self) -> StoreResult<Vec<Engineer>> {
        (**self).load_engineers()
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        (**self).load_projects()
    }

    fn load_allocations(&self) -> StoreResult<Vec<Allocation>> {
        (**self).load_allocations()
    }

    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        (**self).save_allocations(allocations)
    }
}

impl<S: EntityStore + ?Sized> EntityStore for &mut S {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn load_engineers(&self) -> StoreResult<Vec<Engineer>> {
        (**self).load_engineers()
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        (**self).load_projects()
    }

    fn load_allocations(&self) -> StoreResult<Vec<Allocation>> {
        (**self).load_allocations()
    }

    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        (**self).save_allocations(allocations)
    }
}

/// Validates loaded allocations, naming the first offending record.
pub(crate) fn check_allocations(allocations: &[Allocation]) -> StoreResult<()> {
    for allocation in allocations {
        allocation
            .validate()
            .map_err(|err: AllocationValidationError| {
                StoreError::InvalidData(format!("allocation `{}`: {err}", allocation.id))
            })?;
    }
    Ok(())
}
