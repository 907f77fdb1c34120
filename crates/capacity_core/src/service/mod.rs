//! Core use-case services.
//!
//! # Responsibility
//! - Run the capacity rules over whatever entity store the caller injects.
//! - Keep adapters (CLI, remote tools) decoupled from storage details.

pub mod allocation_engine;
pub mod reports;
pub mod response;
