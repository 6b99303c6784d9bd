use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Label, PriorityInfo, Project, Status, User};
use crate::rank::Rank;

/// An issue with its references resolved.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub team_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: PriorityInfo,
    pub assignee: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub project: Option<Project>,
    /// Identifier of the parent issue, if this is a sub-issue.
    pub parent: Option<String>,
    /// Identifiers of direct sub-issues.
    #[serde(default)]
    pub subissues: Vec<String>,
    pub rank: Rank,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.identifier.to_lowercase().contains(&term)
            || self.title.to_lowercase().contains(&term)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }
}
