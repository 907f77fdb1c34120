//! SQLite-backed entity store.
//!
//! # Responsibility
//! - Persist engineers, projects and allocations in one SQLite file.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Each collection replacement runs in one immediate transaction, so a
//!   failed save leaves the previous collection untouched.
//! - Sequence order is preserved through the `position` column.
//! - Read paths reject invalid persisted rows.

use super::{check_allocations, EntityStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use crate::model::allocation::Allocation;
use crate::model::engineer::Engineer;
use crate::model::project::Project;
use log::{error, info};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

pub struct SqliteEntityStore {
    conn: Connection,
}

impl SqliteEntityStore {
    /// Opens or creates a database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a migrated in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Underlying connection, for diagnostics and schema assertions.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replaces the engineer collection, including skill tags.
    pub fn replace_engineers(&mut self, engineers: &[Engineer]) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM engineer_skills;", [])?;
        tx.execute("DELETE FROM engineers;", [])?;
        {
            let mut insert_engineer = tx.prepare(
                "INSERT INTO engineers (id, name, role, position) VALUES (?1, ?2, ?3, ?4);",
            )?;
            let mut insert_skill =
                tx.prepare("INSERT INTO engineer_skills (engineer_id, skill) VALUES (?1, ?2);")?;
            for (position, engineer) in engineers.iter().enumerate() {
                insert_engineer.execute(params![
                    engineer.id.as_str(),
                    engineer.name.as_str(),
                    engineer.role.as_str(),
                    position as i64,
                ])?;
                for skill in &engineer.skills {
                    insert_skill.execute(params![engineer.id.as_str(), skill.as_str()])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replaces the project collection.
    pub fn replace_projects(&mut self, projects: &[Project]) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM projects;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO projects (id, name, description, status, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for (position, project) in projects.iter().enumerate() {
                insert.execute(params![
                    project.id.as_str(),
                    project.name.as_str(),
                    project.description.as_str(),
                    project.status.as_str(),
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_skills(&self) -> StoreResult<BTreeMap<String, BTreeSet<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT engineer_id, skill FROM engineer_skills;")?;
        let mut rows = stmt.query([])?;
        let mut skills: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let engineer_id: String = row.get(0)?;
            let skill: String = row.get(1)?;
            skills.entry(engineer_id).or_default().insert(skill);
        }
        Ok(skills)
    }

    fn write_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM allocations;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO allocations (
                    id,
                    engineer_id,
                    project_id,
                    percentage,
                    start_date,
                    end_date,
                    position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for (position, allocation) in allocations.iter().enumerate() {
                insert.execute(params![
                    allocation.id.as_str(),
                    allocation.engineer_id.as_str(),
                    allocation.project_id.as_str(),
                    i64::from(allocation.percentage),
                    allocation.start_date.as_str(),
                    allocation.end_date.as_str(),
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl EntityStore for SqliteEntityStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn load_engineers(&self) -> StoreResult<Vec<Engineer>> {
        let mut skills = self.load_skills()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, role FROM engineers ORDER BY position ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut engineers = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            engineers.push(Engineer {
                skills: skills.remove(&id).unwrap_or_default(),
                name: row.get("name")?,
                role: row.get("role")?,
                id,
            });
        }
        Ok(engineers)
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, status
             FROM projects
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(Project {
                id: row.get("id")?,
                name: row.get("name")?,
                description: row.get("description")?,
                status: row.get("status")?,
            });
        }
        Ok(projects)
    }

    fn load_allocations(&self) -> StoreResult<Vec<Allocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, engineer_id, project_id, percentage, start_date, end_date
             FROM allocations
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut allocations = Vec::new();
        while let Some(row) = rows.next()? {
            allocations.push(parse_allocation_row(row)?);
        }
        check_allocations(&allocations)?;
        Ok(allocations)
    }

    fn save_allocations(&mut self, allocations: &[Allocation]) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = self.write_allocations(allocations);
        match &result {
            Ok(()) => info!(
                "event=store_save module=store status=ok backend=sqlite count={} duration_ms={}",
                allocations.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => {
                error!("event=store_save module=store status=error backend=sqlite error={err}")
            }
        }
        result
    }
}

fn parse_allocation_row(row: &Row<'_>) -> StoreResult<Allocation> {
    let id: String = row.get("id")?;
    let raw_percentage: i64 = row.get("percentage")?;
    let percentage = u32::try_from(raw_percentage).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid percentage `{raw_percentage}` in allocations.percentage for `{id}`"
        ))
    })?;

    Ok(Allocation {
        engineer_id: row.get("engineer_id")?,
        project_id: row.get("project_id")?,
        percentage,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        id,
    })
}
