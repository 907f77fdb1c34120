//! Capacity allocation engine.
//!
//! # Responsibility
//! - Admit or reject new and updated allocations against the capacity ceiling.
//! - Perform bench transitions by back-dating active allocations.
//! - Answer capacity, bench and history queries through the activity window.
//!
//! # Invariants
//! - For every engineer, the sum of active allocation percentages never
//!   exceeds `MAX_PERCENTAGE` after a successful write.
//! - Rejected operations never call `save_allocations`.
//! - Allocations are never removed from the stored collection.
//! - The engine caches nothing; every operation reloads from the store.
//!
//! # Concurrency
//! - Mutating operations take `&mut self`, so one engine value serializes its
//!   writes. Several processes sharing one backing store are not protected
//!   against lost updates.

use crate::clock::{Clock, SystemClock};
use crate::model::allocation::{
    end_date_before, format_date, generate_allocation_id, validate_percentage, Allocation,
    AllocationId, AllocationState, AllocationUpdate, AllocationValidationError, FieldChange,
    MAX_PERCENTAGE,
};
use crate::model::engineer::{Engineer, EngineerId};
use crate::model::project::{Project, ProjectId};
use crate::service::response::{ErrorKind, Outcome};
use crate::store::{EntityStore, StoreError};
use chrono::NaiveDate;
use log::{info, warn};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Which write path ran the capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityCheck {
    Allocate,
    Update,
}

/// Engine operation failure.
#[derive(Debug)]
pub enum EngineError {
    /// Input outside the accepted domain (percentage range).
    Validation(AllocationValidationError),
    EngineerNotFound(EngineerId),
    ProjectNotFound(ProjectId),
    AllocationNotFound(AllocationId),
    /// Write would push the engineer's active total over the ceiling.
    CapacityExceeded {
        check: CapacityCheck,
        engineer_id: EngineerId,
        engineer_name: Option<String>,
        total_percentage: u32,
    },
    /// Backing store failure, propagated as-is.
    Storage(StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::EngineerNotFound(_) | Self::ProjectNotFound(_) | Self::AllocationNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::EngineerNotFound(id) => write!(f, "Engineer with ID '{id}' not found."),
            Self::ProjectNotFound(id) => write!(f, "Project with ID '{id}' not found."),
            Self::AllocationNotFound(id) => write!(f, "Allocation with ID '{id}' not found."),
            Self::CapacityExceeded {
                check: CapacityCheck::Allocate,
                engineer_id,
                engineer_name,
                total_percentage,
            } => write!(
                f,
                "Cannot allocate. Engineer '{}' would be over-allocated ({total_percentage}%).",
                engineer_name.as_deref().unwrap_or(engineer_id)
            ),
            Self::CapacityExceeded {
                check: CapacityCheck::Update,
                total_percentage,
                ..
            } => write!(
                f,
                "Cannot update. Engineer would be over-allocated ({total_percentage}%)."
            ),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AllocationValidationError> for EngineError {
    fn from(value: AllocationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

/// Request model for creating an allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateRequest {
    pub engineer_id: String,
    pub project_id: String,
    /// Raw caller input; must land in `0..=100`.
    pub percentage: i64,
    pub start_date: String,
    pub end_date: String,
}

/// Successful allocation create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocated {
    pub allocation: Allocation,
    pub engineer_name: String,
    pub project_name: String,
    /// Engineer's active total including the new allocation.
    pub active_percentage: u32,
}

impl Outcome for Allocated {
    fn message(&self) -> String {
        format!(
            "Successfully allocated {} to {} at {}%.",
            self.engineer_name, self.project_name, self.allocation.percentage
        )
    }
}

/// Successful allocation update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Updated {
    pub previous: Allocation,
    pub allocation: Allocation,
}

impl Outcome for Updated {
    fn message(&self) -> String {
        format!("Successfully updated allocation '{}'.", self.allocation.id)
    }
}

/// Result of moving an engineer to the bench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchTransition {
    pub engineer_id: EngineerId,
    pub engineer_name: String,
    /// Ids of allocations whose end date was back-dated, in stored order.
    pub ended_ids: Vec<AllocationId>,
    /// New end date written to every ended allocation; `None` on a no-op.
    pub end_date: Option<String>,
}

impl BenchTransition {
    pub fn count(&self) -> usize {
        self.ended_ids.len()
    }
}

impl Outcome for BenchTransition {
    fn message(&self) -> String {
        if self.ended_ids.is_empty() {
            return format!(
                "Engineer '{}' has no active allocations. Nothing to end (0 removed).",
                self.engineer_name
            );
        }
        format!(
            "Moved {} to bench. Ended {} active allocation(s): {}.",
            self.engineer_name,
            self.ended_ids.len(),
            self.ended_ids.join(", ")
        )
    }
}

/// Key for history queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryKey {
    Engineer(EngineerId),
    Project(ProjectId),
}

/// Every allocation for one key, ordered by start date ascending.
///
/// Iteration tags each record CURRENT or PAST against the evaluation date
/// captured when the history was built. Iterate as often as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationHistory {
    key: HistoryKey,
    today: NaiveDate,
    allocations: Vec<Allocation>,
}

/// One history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry<'a> {
    pub allocation: &'a Allocation,
    pub state: AllocationState,
}

impl AllocationHistory {
    pub fn key(&self) -> &HistoryKey {
        &self.key
    }

    pub fn evaluated_on(&self) -> NaiveDate {
        self.today
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            inner: self.allocations.iter(),
            today: self.today,
        }
    }
}

impl Serialize for AllocationHistory {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let entries: Vec<HistoryEntry<'_>> = self.iter().collect();
        let mut state = serializer.serialize_struct("AllocationHistory", 2)?;
        state.serialize_field("evaluated_on", &format_date(self.today))?;
        state.serialize_field("entries", &entries)?;
        state.end()
    }
}

impl<'a> IntoIterator for &'a AllocationHistory {
    type Item = HistoryEntry<'a>;
    type IntoIter = HistoryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over [`AllocationHistory`].
#[derive(Debug, Clone)]
pub struct HistoryIter<'a> {
    inner: std::slice::Iter<'a, Allocation>,
    today: NaiveDate,
}

impl<'a> Iterator for HistoryIter<'a> {
    type Item = HistoryEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let allocation = self.inner.next()?;
        Some(HistoryEntry {
            allocation,
            state: allocation.state_on(self.today),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for HistoryIter<'_> {}

/// Sum of active allocation percentages for one engineer on `today`.
pub fn active_capacity_of(allocations: &[Allocation], engineer_id: &str, today: NaiveDate) -> u32 {
    allocations
        .iter()
        .filter(|allocation| allocation.engineer_id == engineer_id)
        .filter(|allocation| allocation.is_active_on(today))
        .map(|allocation| allocation.percentage)
        .sum()
}

/// Stateless engine over an injected entity store and clock.
pub struct AllocationEngine<S: EntityStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
}

impl<S: EntityStore> AllocationEngine<S, SystemClock> {
    /// Creates an engine evaluating activity against the local date.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: EntityStore, C: Clock> AllocationEngine<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Evaluation date used by the activity predicate.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Creates an allocation if it fits under the engineer's capacity ceiling.
    ///
    /// # Errors
    /// - `Validation` when the percentage is outside `0..=100`.
    /// - `EngineerNotFound` / `ProjectNotFound` for unknown references.
    /// - `CapacityExceeded` when active total plus the request exceeds 100.
    /// - `Storage` when loading or saving fails.
    pub fn allocate(&mut self, request: &AllocateRequest) -> EngineResult<Allocated> {
        let result = self.try_allocate(request);
        match &result {
            Ok(created) => info!(
                "event=allocation_create module=engine status=ok allocation_id={} engineer_id={} project_id={} percentage={} active_total={}",
                created.allocation.id,
                created.allocation.engineer_id,
                created.allocation.project_id,
                created.allocation.percentage,
                created.active_percentage
            ),
            Err(err) => log_rejection("allocation_create", &request.engineer_id, err),
        }
        result
    }

    fn try_allocate(&mut self, request: &AllocateRequest) -> EngineResult<Allocated> {
        let percentage = validate_percentage(request.percentage)?;

        let engineers = self.store.load_engineers()?;
        let projects = self.store.load_projects()?;
        let mut allocations = self.store.load_allocations()?;

        let engineer = find_engineer(&engineers, &request.engineer_id)?;
        let project = find_project(&projects, &request.project_id)?;

        let committed = active_capacity_of(&allocations, &engineer.id, self.today());
        let total = committed + percentage;
        if total > MAX_PERCENTAGE {
            return Err(EngineError::CapacityExceeded {
                check: CapacityCheck::Allocate,
                engineer_id: engineer.id.clone(),
                engineer_name: Some(engineer.name.clone()),
                total_percentage: total,
            });
        }

        let allocation = Allocation {
            id: unique_allocation_id(&allocations),
            engineer_id: engineer.id.clone(),
            project_id: project.id.clone(),
            percentage,
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
        };
        allocations.push(allocation.clone());
        self.store.save_allocations(&allocations)?;

        Ok(Allocated {
            allocation,
            engineer_name: engineer.name.clone(),
            project_name: project.name.clone(),
            active_percentage: total,
        })
    }

    /// Applies a partial update to one allocation.
    ///
    /// A new percentage is range-checked and re-validated against the
    /// engineer's other active allocations. Date changes are written as given
    /// and do not re-run the ceiling check.
    pub fn update(
        &mut self,
        allocation_id: &str,
        update: &AllocationUpdate,
    ) -> EngineResult<Updated> {
        let result = self.try_update(allocation_id, update);
        match &result {
            Ok(updated) => info!(
                "event=allocation_update module=engine status=ok allocation_id={} percentage={} percentage_changed={} start_changed={} end_changed={}",
                updated.allocation.id,
                updated.allocation.percentage,
                update.percentage.is_set(),
                update.start_date.is_set(),
                update.end_date.is_set()
            ),
            Err(err) => log_rejection("allocation_update", allocation_id, err),
        }
        result
    }

    fn try_update(
        &mut self,
        allocation_id: &str,
        update: &AllocationUpdate,
    ) -> EngineResult<Updated> {
        let mut allocations = self.store.load_allocations()?;
        let index = allocations
            .iter()
            .position(|allocation| allocation.id == allocation_id)
            .ok_or_else(|| EngineError::AllocationNotFound(allocation_id.to_string()))?;
        let previous = allocations[index].clone();

        if let FieldChange::Set(raw) = update.percentage {
            let percentage = validate_percentage(raw)?;
            let today = self.today();
            let others: u32 = allocations
                .iter()
                .filter(|other| other.id != previous.id)
                .filter(|other| other.engineer_id == previous.engineer_id)
                .filter(|other| other.is_active_on(today))
                .map(|other| other.percentage)
                .sum();
            let total = others + percentage;
            if total > MAX_PERCENTAGE {
                return Err(EngineError::CapacityExceeded {
                    check: CapacityCheck::Update,
                    engineer_id: previous.engineer_id.clone(),
                    engineer_name: None,
                    total_percentage: total,
                });
            }
            allocations[index].percentage = percentage;
        }

        if let FieldChange::Set(start_date) = &update.start_date {
            allocations[index].start_date = start_date.clone();
        }
        if let FieldChange::Set(end_date) = &update.end_date {
            allocations[index].end_date = end_date.clone();
        }

        self.store.save_allocations(&allocations)?;

        Ok(Updated {
            previous,
            allocation: allocations[index].clone(),
        })
    }

    /// Ends every active allocation of an engineer ("move to bench").
    ///
    /// Active allocations get `end_date = today - 1 day`; records are kept.
    /// With nothing active this is a no-op and the store is not written.
    pub fn end_allocations(&mut self, engineer_id: &str) -> EngineResult<BenchTransition> {
        let result = self.try_end_allocations(engineer_id);
        match &result {
            Ok(transition) => info!(
                "event=bench_transition module=engine status=ok engineer_id={} ended={}",
                transition.engineer_id,
                transition.count()
            ),
            Err(err) => log_rejection("bench_transition", engineer_id, err),
        }
        result
    }

    fn try_end_allocations(&mut self, engineer_id: &str) -> EngineResult<BenchTransition> {
        let engineers = self.store.load_engineers()?;
        let engineer = find_engineer(&engineers, engineer_id)?;
        let mut allocations = self.store.load_allocations()?;
        let today = self.today();

        let mut transition = BenchTransition {
            engineer_id: engineer.id.clone(),
            engineer_name: engineer.name.clone(),
            ended_ids: Vec::new(),
            end_date: None,
        };

        let end_date = end_date_before(today);
        for allocation in allocations
            .iter_mut()
            .filter(|allocation| allocation.engineer_id == engineer.id)
            .filter(|allocation| allocation.is_active_on(today))
        {
            allocation.end_date = end_date.clone();
            transition.ended_ids.push(allocation.id.clone());
        }

        if transition.ended_ids.is_empty() {
            return Ok(transition);
        }

        self.store.save_allocations(&allocations)?;
        transition.end_date = Some(end_date);
        Ok(transition)
    }

    /// Sum of the engineer's active allocation percentages.
    pub fn active_capacity(&self, engineer_id: &str) -> EngineResult<u32> {
        let engineers = self.store.load_engineers()?;
        let engineer = find_engineer(&engineers, engineer_id)?;
        let allocations = self.store.load_allocations()?;
        Ok(active_capacity_of(&allocations, &engineer.id, self.today()))
    }

    /// Remaining headroom under the ceiling, `100 - active_capacity`.
    pub fn available_capacity(&self, engineer_id: &str) -> EngineResult<u32> {
        let active = self.active_capacity(engineer_id)?;
        Ok(MAX_PERCENTAGE.saturating_sub(active))
    }

    /// Engineers with zero active capacity, in stored order.
    pub fn bench(&self) -> EngineResult<Vec<Engineer>> {
        let engineers = self.store.load_engineers()?;
        let allocations = self.store.load_allocations()?;
        let today = self.today();
        Ok(engineers
            .into_iter()
            .filter(|engineer| active_capacity_of(&allocations, &engineer.id, today) == 0)
            .collect())
    }

    /// All allocations for an engineer or project, oldest start first.
    ///
    /// Records with an unparseable start date sort last, in stored order.
    pub fn history(&self, key: HistoryKey) -> EngineResult<AllocationHistory> {
        let allocations = self.store.load_allocations()?;
        let mut matching: Vec<Allocation> = match &key {
            HistoryKey::Engineer(id) => {
                let engineers = self.store.load_engineers()?;
                find_engineer(&engineers, id)?;
                allocations
                    .into_iter()
                    .filter(|allocation| &allocation.engineer_id == id)
                    .collect()
            }
            HistoryKey::Project(id) => {
                let projects = self.store.load_projects()?;
                find_project(&projects, id)?;
                allocations
                    .into_iter()
                    .filter(|allocation| &allocation.project_id == id)
                    .collect()
            }
        };
        matching.sort_by_key(|allocation| {
            let start = allocation.start();
            (start.is_none(), start)
        });

        Ok(AllocationHistory {
            key,
            today: self.today(),
            allocations: matching,
        })
    }
}

pub(crate) fn find_engineer<'a>(engineers: &'a [Engineer], id: &str) -> EngineResult<&'a Engineer> {
    engineers
        .iter()
        .find(|engineer| engineer.id == id)
        .ok_or_else(|| EngineError::EngineerNotFound(id.to_string()))
}

pub(crate) fn find_project<'a>(projects: &'a [Project], id: &str) -> EngineResult<&'a Project> {
    projects
        .iter()
        .find(|project| project.id == id)
        .ok_or_else(|| EngineError::ProjectNotFound(id.to_string()))
}

fn unique_allocation_id(existing: &[Allocation]) -> AllocationId {
    loop {
        let candidate = generate_allocation_id();
        if existing.iter().all(|allocation| allocation.id != candidate) {
            return candidate;
        }
    }
}

fn log_rejection(event: &str, subject_id: &str, err: &EngineError) {
    match err {
        EngineError::CapacityExceeded {
            total_percentage, ..
        } => warn!(
            "event={event} module=engine status=rejected reason={} subject_id={subject_id} total={total_percentage}",
            err.kind().as_str()
        ),
        EngineError::Storage(source) => warn!(
            "event={event} module=engine status=error reason={} subject_id={subject_id} error={source}",
            err.kind().as_str()
        ),
        _ => warn!(
            "event={event} module=engine status=rejected reason={} subject_id={subject_id}",
            err.kind().as_str()
        ),
    }
}
