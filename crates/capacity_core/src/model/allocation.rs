//! Allocation domain model.
//!
//! # Responsibility
//! - Define the time-bounded assignment of one engineer to one project.
//! - Provide the activity-window predicate and allocation id generation.
//! - Model partial updates as explicit per-field changes.
//!
//! # Invariants
//! - `percentage` stays within `0..=MAX_PERCENTAGE`.
//! - `id`, `engineer_id` and `project_id` are immutable after creation.
//! - An allocation is active while `end_date >= today`; an unparseable
//!   `end_date` counts as active so a real commitment is never hidden.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::engineer::EngineerId;
use super::project::ProjectId;

/// Capacity ceiling for one engineer, in percent.
pub const MAX_PERCENTAGE: u32 = 100;
/// Calendar date format used by stored allocation windows.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const ALLOCATION_ID_PREFIX: &str = "alloc-";
const ALLOCATION_ID_SUFFIX_LEN: usize = 8;

/// Generated allocation identifier (`alloc-` + 8 random hex chars).
pub type AllocationId = String;

/// Time-bounded, fractional assignment of an engineer to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: AllocationId,
    pub engineer_id: EngineerId,
    pub project_id: ProjectId,
    /// Serialized as `allocationPercentage` to match the stored data files.
    #[serde(rename = "allocationPercentage")]
    pub percentage: u32,
    /// Inclusive start, `YYYY-MM-DD`.
    pub start_date: String,
    /// Inclusive end, `YYYY-MM-DD`.
    pub end_date: String,
}

/// Validation failures for allocation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationValidationError {
    /// Percentage outside `0..=100`.
    PercentageOutOfRange(i64),
    /// A required identifier is blank.
    BlankField(&'static str),
}

impl Display for AllocationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PercentageOutOfRange(_) => {
                write!(f, "Allocation percentage must be between 0 and 100.")
            }
            Self::BlankField(field) => write!(f, "allocation field `{field}` must not be blank"),
        }
    }
}

impl Error for AllocationValidationError {}

/// Derived lifecycle state of an allocation at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationState {
    Current,
    Past,
}

impl AllocationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Past => "PAST",
        }
    }
}

impl Display for AllocationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Allocation {
    /// Creates an allocation with a freshly generated id.
    ///
    /// Does not validate the percentage; callers go through
    /// [`validate_percentage`] first.
    pub fn new(
        engineer_id: impl Into<String>,
        project_id: impl Into<String>,
        percentage: u32,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_allocation_id(),
            engineer_id: engineer_id.into(),
            project_id: project_id.into(),
            percentage,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Checks persisted-shape invariants.
    ///
    /// Used by store read paths so corrupt data is rejected, not masked.
    pub fn validate(&self) -> Result<(), AllocationValidationError> {
        if self.id.trim().is_empty() {
            return Err(AllocationValidationError::BlankField("id"));
        }
        if self.engineer_id.trim().is_empty() {
            return Err(AllocationValidationError::BlankField("engineer_id"));
        }
        if self.project_id.trim().is_empty() {
            return Err(AllocationValidationError::BlankField("project_id"));
        }
        if self.percentage > MAX_PERCENTAGE {
            return Err(AllocationValidationError::PercentageOutOfRange(i64::from(
                self.percentage,
            )));
        }
        Ok(())
    }

    /// Returns whether this allocation counts against capacity on `today`.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        is_active(&self.end_date, today)
    }

    /// Returns the derived CURRENT/PAST state on `today`.
    pub fn state_on(&self, today: NaiveDate) -> AllocationState {
        if self.is_active_on(today) {
            AllocationState::Current
        } else {
            AllocationState::Past
        }
    }

    /// Parsed start date, `None` when the stored text is not `YYYY-MM-DD`.
    pub fn start(&self) -> Option<NaiveDate> {
        parse_date(&self.start_date)
    }

    /// Parsed end date, `None` when the stored text is not `YYYY-MM-DD`.
    pub fn end(&self) -> Option<NaiveDate> {
        parse_date(&self.end_date)
    }
}

/// Activity-window predicate over a raw end date.
///
/// Fails open: an end date that cannot be parsed is treated as active.
pub fn is_active(end_date: &str, today: NaiveDate) -> bool {
    match parse_date(end_date) {
        Some(end) => end >= today,
        None => true,
    }
}

/// Parses a `YYYY-MM-DD` calendar date, tolerating surrounding whitespace.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Formats a date in the stored `YYYY-MM-DD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the stored end date that makes an allocation inactive from `today`.
pub fn end_date_before(today: NaiveDate) -> String {
    format_date(today.pred_opt().unwrap_or(NaiveDate::MIN))
}

/// Validates caller-supplied percentage input against `0..=100`.
pub fn validate_percentage(value: i64) -> Result<u32, AllocationValidationError> {
    match u32::try_from(value) {
        Ok(percentage) if percentage <= MAX_PERCENTAGE => Ok(percentage),
        _ => Err(AllocationValidationError::PercentageOutOfRange(value)),
    }
}

/// Generates a new allocation id.
pub fn generate_allocation_id() -> AllocationId {
    let simple = Uuid::new_v4().simple().to_string();
    format!(
        "{ALLOCATION_ID_PREFIX}{}",
        &simple[..ALLOCATION_ID_SUFFIX_LEN]
    )
}

/// One field of a partial update: leave it alone or overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldChange<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> FieldChange<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unchanged => None,
        }
    }
}

impl<T> From<Option<T>> for FieldChange<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Unchanged,
        }
    }
}

/// Partial update of an allocation's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationUpdate {
    /// Raw percentage input; range-checked by the engine.
    pub percentage: FieldChange<i64>,
    pub start_date: FieldChange<String>,
    pub end_date: FieldChange<String>,
}

impl AllocationUpdate {
    pub fn percentage(mut self, value: i64) -> Self {
        self.percentage = FieldChange::Set(value);
        self
    }

    pub fn start_date(mut self, value: impl Into<String>) -> Self {
        self.start_date = FieldChange::Set(value.into());
        self
    }

    pub fn end_date(mut self, value: impl Into<String>) -> Self {
        self.end_date = FieldChange::Set(value.into());
        self
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        !self.percentage.is_set() && !self.start_date.is_set() && !self.end_date.is_set()
    }
}
