//! Capacity allocation core.
//! This crate is the single source of truth for the capacity ceiling and the
//! activity window; adapters only format what it returns.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{open_store, StoreBackend, DEFAULT_DATA_DIR};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::allocation::{
    is_active, parse_date, Allocation, AllocationId, AllocationState, AllocationUpdate,
    AllocationValidationError, FieldChange, MAX_PERCENTAGE,
};
pub use model::engineer::{Engineer, EngineerId};
pub use model::project::{Project, ProjectId};
pub use service::allocation_engine::{
    active_capacity_of, AllocateRequest, Allocated, AllocationEngine, AllocationHistory,
    BenchTransition, CapacityCheck, EngineError, EngineResult, HistoryEntry, HistoryKey, Updated,
};
pub use service::reports::{
    CapacityStatus, EngineerAssignment, EngineerSummary, OverviewRow, ProjectAssignment,
    ProjectSummary,
};
pub use service::response::{ActionResponse, ErrorKind, Outcome};
pub use store::json_store::JsonFileStore;
pub use store::memory_store::MemoryStore;
pub use store::sqlite_store::SqliteEntityStore;
pub use store::{EntityStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
