//! Read-only projections joining engineers, projects and allocations.
//!
//! Everything here goes through the same activity window the engine uses for
//! its ceiling check, so "active" means the same thing in every view.
//! References that no longer resolve fall back to the raw id.

use super::allocation_engine::{
    active_capacity_of, find_engineer, find_project, AllocationEngine, EngineResult,
};
use crate::clock::Clock;
use crate::model::allocation::{Allocation, AllocationState, MAX_PERCENTAGE};
use crate::model::engineer::Engineer;
use crate::model::project::Project;
use crate::store::EntityStore;
use chrono::NaiveDate;
use serde::Serialize;

/// Capacity band of an engineer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    OnBench,
    PartiallyAllocated,
    FullyAllocated,
}

impl CapacityStatus {
    pub fn from_active(active_percentage: u32) -> Self {
        match active_percentage {
            0 => Self::OnBench,
            p if p >= MAX_PERCENTAGE => Self::FullyAllocated,
            _ => Self::PartiallyAllocated,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OnBench => "On Bench",
            Self::PartiallyAllocated => "Partially Allocated",
            Self::FullyAllocated => "Fully Allocated",
        }
    }
}

/// Active allocation joined with its project name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineerAssignment {
    pub allocation: Allocation,
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineerSummary {
    pub engineer: Engineer,
    pub active_percentage: u32,
    pub available_percentage: u32,
    pub status: CapacityStatus,
    pub assignments: Vec<EngineerAssignment>,
}

/// Active allocation joined with the assigned engineer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectAssignment {
    pub allocation: Allocation,
    pub engineer_name: String,
    pub engineer_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    /// Sum of active percentages across all assigned engineers.
    pub total_percentage: u32,
    /// Distinct engineers with at least one active allocation.
    pub engineer_count: usize,
    pub assignments: Vec<ProjectAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewRow {
    pub allocation: Allocation,
    pub engineer_name: String,
    pub project_name: String,
    pub state: AllocationState,
}

impl<S: EntityStore, C: Clock> AllocationEngine<S, C> {
    pub fn list_engineers(&self) -> EngineResult<Vec<Engineer>> {
        Ok(self.store().load_engineers()?)
    }

    pub fn list_projects(&self) -> EngineResult<Vec<Project>> {
        Ok(self.store().load_projects()?)
    }

    /// Capacity summary and active assignments for one engineer.
    pub fn engineer_summary(&self, engineer_id: &str) -> EngineResult<EngineerSummary> {
        let engineers = self.store().load_engineers()?;
        let engineer = find_engineer(&engineers, engineer_id)?.clone();
        let projects = self.store().load_projects()?;
        let allocations = self.store().load_allocations()?;
        Ok(summarize(engineer, &allocations, &projects, self.today()))
    }

    /// Engineers with headroom under the ceiling, most available first.
    ///
    /// `skill` keeps only engineers carrying that tag (ASCII case-insensitive).
    /// Ties keep stored order.
    pub fn available_engineers(&self, skill: Option<&str>) -> EngineResult<Vec<EngineerSummary>> {
        let engineers = self.store().load_engineers()?;
        let projects = self.store().load_projects()?;
        let allocations = self.store().load_allocations()?;
        let today = self.today();
        let skill = skill.map(str::trim).filter(|skill| !skill.is_empty());

        let mut available: Vec<EngineerSummary> = engineers
            .into_iter()
            .filter(|engineer| skill.map_or(true, |skill| has_skill(engineer, skill)))
            .map(|engineer| summarize(engineer, &allocations, &projects, today))
            .filter(|summary| summary.available_percentage > 0)
            .collect();
        available.sort_by(|a, b| b.available_percentage.cmp(&a.available_percentage));
        Ok(available)
    }

    /// Staffing summary and active assignments for one project.
    pub fn project_summary(&self, project_id: &str) -> EngineResult<ProjectSummary> {
        let projects = self.store().load_projects()?;
        let project = find_project(&projects, project_id)?.clone();
        let engineers = self.store().load_engineers()?;
        let allocations = self.store().load_allocations()?;
        let today = self.today();

        let assignments: Vec<ProjectAssignment> = allocations
            .into_iter()
            .filter(|allocation| allocation.project_id == project.id)
            .filter(|allocation| allocation.is_active_on(today))
            .map(|allocation| {
                let engineer = engineers
                    .iter()
                    .find(|engineer| engineer.id == allocation.engineer_id);
                ProjectAssignment {
                    engineer_name: engineer
                        .map_or_else(|| allocation.engineer_id.clone(), |e| e.name.clone()),
                    engineer_role: engineer.map(|e| e.role.clone()),
                    allocation,
                }
            })
            .collect();

        let total_percentage: u32 = assignments
            .iter()
            .map(|assignment| assignment.allocation.percentage)
            .sum();
        let mut engineer_ids: Vec<&str> = assignments
            .iter()
            .map(|assignment| assignment.allocation.engineer_id.as_str())
            .collect();
        engineer_ids.sort_unstable();
        engineer_ids.dedup();
        let engineer_count = engineer_ids.len();

        Ok(ProjectSummary {
            project,
            total_percentage,
            engineer_count,
            assignments,
        })
    }

    /// Every stored allocation with names resolved and state derived.
    pub fn overview(&self) -> EngineResult<Vec<OverviewRow>> {
        let engineers = self.store().load_engineers()?;
        let projects = self.store().load_projects()?;
        let allocations = self.store().load_allocations()?;
        let today = self.today();

        Ok(allocations
            .into_iter()
            .map(|allocation| OverviewRow {
                engineer_name: engineer_name(&engineers, &allocation.engineer_id),
                project_name: project_name(&projects, &allocation.project_id),
                state: allocation.state_on(today),
                allocation,
            })
            .collect())
    }
}

fn summarize(
    engineer: Engineer,
    allocations: &[Allocation],
    projects: &[Project],
    today: NaiveDate,
) -> EngineerSummary {
    let active_percentage = active_capacity_of(allocations, &engineer.id, today);
    let assignments = allocations
        .iter()
        .filter(|allocation| allocation.engineer_id == engineer.id)
        .filter(|allocation| allocation.is_active_on(today))
        .map(|allocation| EngineerAssignment {
            project_name: project_name(projects, &allocation.project_id),
            allocation: allocation.clone(),
        })
        .collect();

    EngineerSummary {
        engineer,
        active_percentage,
        available_percentage: MAX_PERCENTAGE.saturating_sub(active_percentage),
        status: CapacityStatus::from_active(active_percentage),
        assignments,
    }
}

fn has_skill(engineer: &Engineer, skill: &str) -> bool {
    engineer
        .skills
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(skill))
}

fn engineer_name(engineers: &[Engineer], id: &str) -> String {
    engineers
        .iter()
        .find(|engineer| engineer.id == id)
        .map_or_else(|| id.to_string(), |engineer| engineer.name.clone())
}

fn project_name(projects: &[Project], id: &str) -> String {
    projects
        .iter()
        .find(|project| project.id == id)
        .map_or_else(|| id.to_string(), |project| project.name.clone())
}
