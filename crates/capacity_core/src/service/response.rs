//! Structured `(ok, message, payload)` envelope for adapter callers.
//!
//! Adapters show `message` verbatim; `payload` carries the created or changed
//! records on success.

use serde::Serialize;

use super::allocation_engine::EngineResult;

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    CapacityExceeded,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::Storage => "storage",
        }
    }
}

/// Successful operation result that can describe itself to a user.
pub trait Outcome {
    fn message(&self) -> String;
}

/// Response envelope built from an engine result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse<T> {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T: Outcome> From<EngineResult<T>> for ActionResponse<T> {
    fn from(value: EngineResult<T>) -> Self {
        match value {
            Ok(outcome) => Self {
                ok: true,
                message: outcome.message(),
                error_kind: None,
                payload: Some(outcome),
            },
            Err(err) => Self {
                ok: false,
                message: err.to_string(),
                error_kind: Some(err.kind()),
                payload: None,
            },
        }
    }
}
