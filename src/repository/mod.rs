//! Storage adapters.
//!
//! Every backend implements [`IssueRepository`] over plain rows; identifier
//! numbering, rank assignment and hydration live once in
//! [`crate::tracker::Tracker`]. The adapter is chosen from configuration by
//! [`open_repository`].
//!
//! - [`SqliteRepository`]: local SQLite file with embedded migrations
//! - [`HostedRepository`]: Supabase REST API in a multi-tenant schema

pub mod hosted;
pub mod sqlite;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use hosted::HostedRepository;
pub use sqlite::SqliteRepository;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::rank::Rank;
use crate::types::{Label, PriorityInfo, Project, Status, Team, User};

/// Bucket key for issues without an assignee.
pub const UNASSIGNED: &str = "unassigned";
/// Bucket key for issues outside any project.
pub const NO_PROJECT: &str = "no-project";

/// An issue as stored: references are ids, not resolved records.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssueRow {
    pub id: String,
    pub identifier: String,
    pub team_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status_id: String,
    pub priority_id: String,
    pub assignee_id: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub rank: Rank,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub label_ids: Vec<String>,
}

/// Row-level filter. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub team_id: Option<String>,
    pub status_id: Option<String>,
    pub priority_id: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub label_id: Option<String>,
    pub parent_id: Option<String>,
}

/// Partial update. Outer `None` leaves a field alone; for nullable columns an
/// inner `None` clears it.
#[derive(Debug, Clone, Default)]
pub struct IssueChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status_id: Option<String>,
    pub priority_id: Option<String>,
    pub assignee_id: Option<Option<String>>,
    pub project_id: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub rank: Option<Rank>,
    pub label_ids: Option<Vec<String>>,
}

impl IssueChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status_id.is_none()
            && self.priority_id.is_none()
            && self.assignee_id.is_none()
            && self.project_id.is_none()
            && self.parent_id.is_none()
            && self.rank.is_none()
            && self.label_ids.is_none()
    }
}

/// Dimension for grouped issue counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CountKind {
    Status,
    Priority,
    Assignee,
    Project,
    Label,
}

impl fmt::Display for CountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountKind::Status => write!(f, "status"),
            CountKind::Priority => write!(f, "priority"),
            CountKind::Assignee => write!(f, "assignee"),
            CountKind::Project => write!(f, "project"),
            CountKind::Label => write!(f, "label"),
        }
    }
}

/// Reference data and demo issues written by `circle db seed`.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub statuses: Vec<Status>,
    pub priorities: Vec<PriorityInfo>,
    pub labels: Vec<Label>,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub teams: Vec<Team>,
    pub issues: Vec<IssueRow>,
}

#[async_trait]
pub trait IssueRepository: Send + Sync {
    fn backend(&self) -> Backend;

    /// Statuses in display order.
    async fn list_statuses(&self) -> Result<Vec<Status>>;

    /// Priorities in display order.
    async fn list_priorities(&self) -> Result<Vec<PriorityInfo>>;

    async fn list_labels(&self) -> Result<Vec<Label>>;

    /// Users by name, with the ids of their teams.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Teams with member and project ids.
    async fn list_teams(&self) -> Result<Vec<Team>>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Issues matching `filter`, newest first.
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRow>>;

    /// Look up one issue by id or identifier.
    async fn find_issue(&self, key: &str) -> Result<Option<IssueRow>>;

    async fn insert_issue(&self, row: &IssueRow) -> Result<()>;

    async fn update_issue(&self, id: &str, changes: &IssueChanges) -> Result<()>;

    async fn delete_issue(&self, id: &str) -> Result<()>;

    /// Grouped counts. For every kind but `Label` the buckets sum to the total
    /// number of issues.
    async fn count_issues(&self, kind: CountKind) -> Result<BTreeMap<String, u64>>;

    /// Upsert reference data and issues.
    async fn seed(&self, data: &SeedData) -> Result<()>;
}

/// Open the adapter selected by `config`.
pub fn open_repository(config: &Config) -> Result<Box<dyn IssueRepository>> {
    match config.backend()? {
        Backend::Local => {
            let path = config.database_path()?;
            let repo = SqliteRepository::open(&path)?;
            let applied = repo.migrate()?;
            if !applied.is_empty() {
                tracing::info!(count = applied.len(), "applied pending migrations");
            }
            Ok(Box::new(repo))
        }
        Backend::Hosted => {
            let credentials = config.hosted_credentials()?;
            Ok(Box::new(HostedRepository::new(credentials)))
        }
    }
}
