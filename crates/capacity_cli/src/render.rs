//! Plain-text rendering of engine query results.

use capacity_core::{
    Allocation, AllocationHistory, Engineer, EngineerSummary, HistoryKey, OverviewRow, Project,
    ProjectSummary, MAX_PERCENTAGE,
};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Active/available capacity for one engineer.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityLine {
    pub engineer_id: String,
    pub active_percentage: u32,
    pub available_percentage: u32,
}

impl CapacityLine {
    pub fn new(engineer_id: String, active_percentage: u32) -> Self {
        Self {
            engineer_id,
            active_percentage,
            available_percentage: MAX_PERCENTAGE.saturating_sub(active_percentage),
        }
    }
}

impl Display for CapacityLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}% active, {}% available",
            self.engineer_id, self.active_percentage, self.available_percentage
        )
    }
}

pub fn engineers(engineers: &[Engineer]) -> String {
    let mut out = format!("Engineers ({}):\n", engineers.len());
    for engineer in engineers {
        out.push_str(&engineer_line(engineer));
    }
    out
}

pub fn projects(projects: &[Project]) -> String {
    let mut out = format!("Projects ({}):\n", projects.len());
    for project in projects {
        out.push_str(&format!(
            "  - {} [{}] {}: {}\n",
            project.id, project.status, project.name, project.description
        ));
    }
    out
}

pub fn bench(engineers: &[Engineer]) -> String {
    if engineers.is_empty() {
        return "No engineers are currently on the bench. All engineers are allocated.".to_string();
    }
    let mut out = format!("Engineers on Bench ({}):\n", engineers.len());
    for engineer in engineers {
        out.push_str(&engineer_line(engineer));
    }
    out
}

pub fn available(summaries: &[EngineerSummary], skill: Option<&str>) -> String {
    let filter = skill
        .map(|skill| format!(" with skill '{skill}'"))
        .unwrap_or_default();
    if summaries.is_empty() {
        return format!("No engineers{filter} have available capacity.");
    }
    let mut out = format!("Available Engineers{filter} ({}):\n", summaries.len());
    for summary in summaries {
        let engineer = &summary.engineer;
        out.push_str(&format!(
            "  - {} {} ({}): {}% available [{}]\n    Skills: {}\n",
            engineer.id,
            engineer.name,
            engineer.role,
            summary.available_percentage,
            summary.status.label(),
            join_skills(engineer)
        ));
    }
    out
}

pub fn history(history: &AllocationHistory) -> String {
    let subject = match history.key() {
        HistoryKey::Engineer(id) => format!("engineer {id}"),
        HistoryKey::Project(id) => format!("project {id}"),
    };
    let mut out = format!(
        "History for {subject} as of {} ({} record(s)):\n",
        history.evaluated_on(),
        history.len()
    );
    for entry in history {
        let allocation = entry.allocation;
        out.push_str(&format!(
            "  [{}] {} {} -> {} {}\n",
            entry.state,
            allocation.id,
            allocation.engineer_id,
            allocation.project_id,
            window(allocation)
        ));
    }
    out
}

pub fn engineer_summary(summary: &EngineerSummary) -> String {
    let engineer = &summary.engineer;
    let mut out = format!(
        "{} ({}) - {}\nSkills: {}\nActive: {}%  Available: {}%  Status: {}\n",
        engineer.name,
        engineer.id,
        engineer.role,
        join_skills(engineer),
        summary.active_percentage,
        summary.available_percentage,
        summary.status.label()
    );
    if summary.assignments.is_empty() {
        out.push_str("No active allocations. Engineer is available on the bench.\n");
    }
    for assignment in &summary.assignments {
        let allocation = &assignment.allocation;
        out.push_str(&format!(
            "  - {}: {} [{}]\n",
            assignment.project_name,
            window(allocation),
            allocation.id
        ));
    }
    out
}

pub fn project_summary(summary: &ProjectSummary) -> String {
    let project = &summary.project;
    let mut out = format!("{} ({}) - {}\n", project.name, project.id, project.status);
    if !project.description.is_empty() {
        out.push_str(&project.description);
        out.push('\n');
    }
    out.push_str(&format!(
        "Total engineer allocation: {}% across {} engineer(s)\n",
        summary.total_percentage, summary.engineer_count
    ));
    if summary.assignments.is_empty() {
        out.push_str("No engineers currently allocated to this project.\n");
    }
    for assignment in &summary.assignments {
        let allocation = &assignment.allocation;
        out.push_str(&format!(
            "  - {} ({}): {} [{}]\n",
            assignment.engineer_name,
            assignment.engineer_role.as_deref().unwrap_or("Unknown"),
            window(allocation),
            allocation.id
        ));
    }
    out
}

pub fn overview(rows: &[OverviewRow]) -> String {
    if rows.is_empty() {
        return "No allocations found.".to_string();
    }
    let mut out = format!("All Allocations ({}):\n", rows.len());
    for row in rows {
        out.push_str(&format!(
            "  [{}] {} {} -> {} {}\n",
            row.state,
            row.allocation.id,
            row.engineer_name,
            row.project_name,
            window(&row.allocation)
        ));
    }
    out
}

/// `60% (2024-01-01 to 2024-12-31)`
fn window(allocation: &Allocation) -> String {
    format!(
        "{}% ({} to {})",
        allocation.percentage, allocation.start_date, allocation.end_date
    )
}

fn engineer_line(engineer: &Engineer) -> String {
    format!(
        "  - {} {} ({})\n    Skills: {}\n",
        engineer.id,
        engineer.name,
        engineer.role,
        join_skills(engineer)
    )
}

fn join_skills(engineer: &Engineer) -> String {
    engineer
        .skills
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{available, bench, overview};
    use capacity_core::{CapacityStatus, Engineer, EngineerSummary};

    #[test]
    fn empty_views_use_sentences() {
        assert_eq!(
            bench(&[]),
            "No engineers are currently on the bench. All engineers are allocated."
        );
        assert_eq!(overview(&[]), "No allocations found.");
        assert_eq!(
            available(&[], Some("rust")),
            "No engineers with skill 'rust' have available capacity."
        );
    }

    #[test]
    fn available_lists_headroom_and_status() {
        let summary = EngineerSummary {
            engineer: Engineer::new("eng-001", "Alice Smith", "Backend Engineer")
                .with_skills(["rust", "sql"]),
            active_percentage: 70,
            available_percentage: 30,
            status: CapacityStatus::PartiallyAllocated,
            assignments: Vec::new(),
        };
        let text = available(&[summary], None);
        assert!(text.starts_with("Available Engineers (1):\n"));
        assert!(text.contains("eng-001 Alice Smith (Backend Engineer): 30% available [Partially Allocated]"));
        assert!(text.contains("Skills: rust, sql"));
    }
}
