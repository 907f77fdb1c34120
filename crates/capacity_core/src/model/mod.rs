//! Domain model for engineers, projects and capacity allocations.
//!
//! # Responsibility
//! - Define canonical records read and written by the allocation engine.
//! - Own the activity-window predicate shared by engine and reports.
//!
//! # Invariants
//! - Engineers and projects are read-only from the engine's perspective.
//! - Allocations are never hard-deleted; ending one back-dates `end_date`.
//! - Activity is derived from `(end_date, today)`, never stored.

pub mod allocation;
pub mod engineer;
pub mod project;
