//! Engineer reference record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque engineer identifier (by convention `eng-001`).
pub type EngineerId = String;

/// A person whose capacity is allocated to projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engineer {
    pub id: EngineerId,
    pub name: String,
    /// Free-form role label, e.g. `Backend Engineer`.
    pub role: String,
    /// Skill tags; order is irrelevant so they are kept sorted.
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl Engineer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            skills: BTreeSet::new(),
        }
    }

    /// Builder-style helper used by seeding code and tests.
    pub fn with_skills<I, T>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}
