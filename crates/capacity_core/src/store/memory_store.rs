//! In-memory entity store.
//!
//! Holds the three collections in plain vectors. Used for tests and for
//! embedding the engine where durability is handled elsewhere.

use super::{EntityStore, StoreError, StoreResult};
use crate::model::allocation::Allocation;
use crate::model::engineer::Engineer;
use crate::model::project::Project;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    engineers: Vec<Engineer>,
    projects: Vec<Project>,
    allocations: Vec<Allocation>,
    save_count: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(engineers: Vec<Engineer>, projects: Vec<Project>) -> Self {
        Self {
            engineers,
            projects,
            ..Self::default()
        }
    }

    pub fn with_allocations(mut self, allocations: Vec<Allocation>) -> Self {
        self.allocations = allocations;
        self
    }

    /// Current stored allocation collection.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Number of successful `save_allocations` calls so far.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// Makes every subsequent save fail with a storage error.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }
}

impl EntityStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn load_engineers(&self) -> StoreResult<Vec<Engineer>> {
        Ok(self.engineers.clone())
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.projects.clone())
    }

    fn load_allocations(&self) -> StoreResult<Vec<Allocation>> {
        Ok(self.allocations.clone())
    }

    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        if self.fail_saves {
            return Err(StoreError::InvalidData(
                "memory store configured to reject saves".to_string(),
            ));
        }
        self.allocations = allocations.to_vec();
        self.save_count += 1;
        Ok(())
    }
}
