//! Issue operations shared by every storage backend.
//!
//! [`Tracker`] sits on top of an [`IssueRepository`] and owns the rules the
//! adapters must not duplicate: `TEAM-N` identifier numbering, rank
//! assignment on create and move, sub-issue validation, and hydration of
//! stored rows into [`Issue`] values.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::Utc;
use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Backend;
use crate::error::{CircleError, Result};
use crate::issues::{sort_by_created, sort_by_priority, sort_by_rank};
use crate::rank::{self, Rank};
use crate::repository::{
    CountKind, IssueChanges, IssueFilter, IssueRepository, IssueRow, SeedData, NO_PROJECT,
    UNASSIGNED,
};
use crate::store::{Action, Store};
use crate::types::{
    default_priorities, default_statuses, Issue, Label, Priority, PriorityInfo, Project, Status,
    Team, User,
};

/// Value accepted by `--assignee` and `--project` to clear the field.
pub const CLEAR: &str = "none";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum IssueSort {
    /// Newest first
    #[default]
    Created,
    /// Urgent first
    Priority,
    /// Board order
    Rank,
}

/// User-facing issue filter. Values are keys or names, resolved against the
/// reference data before hitting storage.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    pub team: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub label: Option<String>,
    pub search: Option<String>,
    pub sort: IssueSort,
}

#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub team: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub project: Option<String>,
    pub labels: Vec<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    /// A user key, or [`CLEAR`] to unassign.
    pub assignee: Option<String>,
    /// A project key, or [`CLEAR`] to detach.
    pub project: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.project.is_none()
            && self.labels.is_none()
    }
}

/// Where a moved issue lands inside its status column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    Before(String),
    After(String),
}

/// One bucket of a grouped count, with a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
    pub key: String,
    pub name: String,
    pub count: u64,
}

/// Reference data loaded once per operation.
#[derive(Debug, Clone, Default)]
pub struct References {
    pub statuses: Vec<Status>,
    pub priorities: Vec<PriorityInfo>,
    pub labels: Vec<Label>,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub teams: Vec<Team>,
}

impl References {
    pub fn status(&self, key: &str) -> Result<&Status> {
        self.statuses
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(key) || s.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| CircleError::StatusNotFound(key.to_string()))
    }

    pub fn priority(&self, priority: Priority) -> Result<&PriorityInfo> {
        self.priorities
            .iter()
            .find(|p| p.level() == Some(priority))
            .ok_or_else(|| CircleError::PriorityNotFound(priority.slug().to_string()))
    }

    pub fn team(&self, key: &str) -> Result<&Team> {
        self.teams
            .iter()
            .find(|t| t.key.eq_ignore_ascii_case(key) || t.id == key)
            .ok_or_else(|| CircleError::TeamNotFound(key.to_string()))
    }

    pub fn user(&self, key: &str) -> Result<&User> {
        self.users
            .iter()
            .find(|u| {
                u.id == key
                    || u.name.eq_ignore_ascii_case(key)
                    || u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| CircleError::UserNotFound(key.to_string()))
    }

    pub fn project(&self, key: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == key || p.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| CircleError::ProjectNotFound(key.to_string()))
    }

    pub fn label(&self, key: &str) -> Result<&Label> {
        self.labels
            .iter()
            .find(|l| l.id.eq_ignore_ascii_case(key) || l.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| CircleError::LabelNotFound(key.to_string()))
    }

    /// The status a new issue starts in.
    fn first_status(&self) -> Result<&Status> {
        self.statuses
            .iter()
            .min_by_key(|s| s.display_order)
            .ok_or(CircleError::NoStatuses)
    }

    fn label_ids(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut ids = keys
            .iter()
            .map(|key| self.label(key).map(|l| l.id.clone()))
            .collect::<Result<Vec<_>>>()?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn hydrate(&self, row: IssueRow, index: &IssueIndex) -> Issue {
        let status = match self.statuses.iter().find(|s| s.id == row.status_id) {
            Some(status) => status.clone(),
            None => {
                tracing::warn!(issue = %row.identifier, status = %row.status_id, "unknown status");
                Status::unresolved(&row.status_id)
            }
        };

        let priority = match self.priorities.iter().find(|p| p.id == row.priority_id) {
            Some(priority) => priority.clone(),
            None => {
                tracing::warn!(issue = %row.identifier, priority = %row.priority_id, "unknown priority");
                PriorityInfo::unresolved(&row.priority_id)
            }
        };

        let assignee = row.assignee_id.as_deref().and_then(|id| {
            let user = self.users.iter().find(|u| u.id == id).cloned();
            if user.is_none() {
                tracing::warn!(issue = %row.identifier, assignee = id, "unknown assignee");
            }
            user
        });

        let project = row.project_id.as_deref().and_then(|id| {
            let project = self.projects.iter().find(|p| p.id == id).cloned();
            if project.is_none() {
                tracing::warn!(issue = %row.identifier, project = id, "unknown project");
            }
            project
        });

        let labels = row
            .label_ids
            .iter()
            .filter_map(|id| self.labels.iter().find(|l| &l.id == id).cloned())
            .collect();

        let parent = row
            .parent_id
            .as_deref()
            .and_then(|id| index.identifiers.get(id).cloned());
        let subissues = index.children.get(&row.id).cloned().unwrap_or_default();

        Issue {
            id: row.id,
            identifier: row.identifier,
            team_id: row.team_id,
            title: row.title,
            description: row.description,
            status,
            priority,
            assignee,
            labels,
            project,
            parent,
            subissues,
            rank: row.rank,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Parent/child lookups over every stored issue.
#[derive(Debug, Default)]
struct IssueIndex {
    identifiers: HashMap<String, String>,
    parents: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
}

impl IssueIndex {
    fn build(rows: &[IssueRow]) -> Self {
        let mut index = IssueIndex::default();
        for row in rows {
            index
                .identifiers
                .insert(row.id.clone(), row.identifier.clone());
            if let Some(parent) = &row.parent_id {
                index.parents.insert(row.id.clone(), parent.clone());
                index
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(row.identifier.clone());
            }
        }
        for children in index.children.values_mut() {
            children.sort_by_key(|identifier| identifier_number(identifier));
        }
        index
    }

    /// True when `ancestor` is `id` or one of its parents.
    fn has_ancestor(&self, id: &str, ancestor: &str) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.parents.len() {
                break;
            }
            current = self.parents.get(node).map(String::as_str);
        }
        false
    }
}

/// Number part of a `TEAM-N` identifier.
fn identifier_number(identifier: &str) -> Option<u64> {
    static IDENTIFIER_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = IDENTIFIER_RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*)-(\d+)$").ok());

    re.as_ref()
        .and_then(|re| re.captures(identifier))
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Next free identifier for a team, one past the highest number in use.
fn next_identifier(team_key: &str, existing: &[IssueRow]) -> String {
    let prefix = format!("{}-", team_key.to_ascii_uppercase());
    let highest = existing
        .iter()
        .filter(|row| row.identifier.to_ascii_uppercase().starts_with(&prefix))
        .filter_map(|row| identifier_number(&row.identifier))
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", highest + 1)
}

/// Seed issues minus those whose identifier already belongs to a different
/// stored issue. Parent links to a dropped issue are cleared.
fn without_taken_identifiers(data: &SeedData, existing: &[IssueRow]) -> SeedData {
    let taken: HashMap<String, &str> = existing
        .iter()
        .map(|row| (row.identifier.to_ascii_uppercase(), row.id.as_str()))
        .collect();

    let mut dropped: Vec<String> = Vec::new();
    let mut issues: Vec<IssueRow> = Vec::with_capacity(data.issues.len());
    for issue in &data.issues {
        match taken.get(&issue.identifier.to_ascii_uppercase()) {
            Some(id) if *id != issue.id => {
                tracing::warn!(identifier = %issue.identifier, "identifier in use, skipping seed issue");
                dropped.push(issue.id.clone());
            }
            _ => issues.push(issue.clone()),
        }
    }

    for issue in &mut issues {
        let orphaned = issue.parent_id.as_ref().is_some_and(|parent| {
            dropped.contains(parent) && !existing.iter().any(|row| &row.id == parent)
        });
        if orphaned {
            issue.parent_id = None;
        }
    }

    SeedData {
        issues,
        ..data.clone()
    }
}

fn last_rank(rows: &[IssueRow]) -> Option<&Rank> {
    rows.iter().map(|row| &row.rank).max()
}

pub struct Tracker {
    repo: Box<dyn IssueRepository>,
}

impl Tracker {
    pub fn new(repo: Box<dyn IssueRepository>) -> Self {
        Self { repo }
    }

    pub fn backend(&self) -> Backend {
        self.repo.backend()
    }

    pub fn repository(&self) -> &dyn IssueRepository {
        self.repo.as_ref()
    }

    pub async fn references(&self) -> Result<References> {
        Ok(References {
            statuses: self.repo.list_statuses().await?,
            priorities: self.repo.list_priorities().await?,
            labels: self.repo.list_labels().await?,
            users: self.repo.list_users().await?,
            projects: self.repo.list_projects().await?,
            teams: self.repo.list_teams().await?,
        })
    }

    /// Stored statuses, or the default set when storage has none.
    pub async fn statuses(&self) -> Result<Vec<Status>> {
        let statuses = self.repo.list_statuses().await?;
        if statuses.is_empty() {
            tracing::warn!("no statuses stored, showing defaults");
            return Ok(default_statuses());
        }
        Ok(statuses)
    }

    /// Stored priorities, or the default set when storage has none.
    pub async fn priorities(&self) -> Result<Vec<PriorityInfo>> {
        let priorities = self.repo.list_priorities().await?;
        if priorities.is_empty() {
            tracing::warn!("no priorities stored, showing defaults");
            return Ok(default_priorities());
        }
        Ok(priorities)
    }

    async fn index(&self) -> Result<(Vec<IssueRow>, IssueIndex)> {
        let rows = self.repo.list_issues(&IssueFilter::default()).await?;
        let index = IssueIndex::build(&rows);
        Ok((rows, index))
    }

    async fn find_row(&self, key: &str) -> Result<IssueRow> {
        self.repo
            .find_issue(key)
            .await?
            .ok_or_else(|| CircleError::IssueNotFound(key.to_string()))
    }

    async fn hydrate_one(&self, refs: &References, key: &str) -> Result<Issue> {
        let row = self.find_row(key).await?;
        let (_, index) = self.index().await?;
        Ok(refs.hydrate(row, &index))
    }

    async fn bucket(&self, status_id: &str, excluding: Option<&str>) -> Result<Vec<IssueRow>> {
        let filter = IssueFilter {
            status_id: Some(status_id.to_string()),
            ..IssueFilter::default()
        };
        let mut rows = self.repo.list_issues(&filter).await?;
        if let Some(id) = excluding {
            rows.retain(|row| row.id != id);
        }
        rows.sort_by(|a, b| a.rank.cmp(&b.rank));
        Ok(rows)
    }

    fn filter_for(refs: &References, query: &IssueQuery) -> Result<IssueFilter> {
        Ok(IssueFilter {
            team_id: query
                .team
                .as_deref()
                .map(|key| refs.team(key).map(|t| t.id.clone()))
                .transpose()?,
            status_id: query
                .status
                .as_deref()
                .map(|key| refs.status(key).map(|s| s.id.clone()))
                .transpose()?,
            priority_id: query.priority.map(|p| p.slug().to_string()),
            project_id: query
                .project
                .as_deref()
                .map(|key| refs.project(key).map(|p| p.id.clone()))
                .transpose()?,
            assignee_id: query
                .assignee
                .as_deref()
                .map(|key| refs.user(key).map(|u| u.id.clone()))
                .transpose()?,
            label_id: query
                .label
                .as_deref()
                .map(|key| refs.label(key).map(|l| l.id.clone()))
                .transpose()?,
            parent_id: None,
        })
    }

    pub async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let refs = self.references().await?;
        let filter = Self::filter_for(&refs, query)?;
        let rows = self.repo.list_issues(&filter).await?;
        let (_, index) = self.index().await?;

        let search = query.search.as_deref().unwrap_or_default();
        let issues: Vec<Issue> = rows
            .into_iter()
            .map(|row| refs.hydrate(row, &index))
            .filter(|issue| issue.matches_search(search))
            .collect();

        tracing::debug!(count = issues.len(), sort = ?query.sort, "listed issues");

        Ok(match query.sort {
            IssueSort::Created => sort_by_created(&issues),
            IssueSort::Priority => sort_by_priority(&issues),
            IssueSort::Rank => sort_by_rank(&issues),
        })
    }

    /// One issue by identifier (`ENG-12`, any case) or id.
    pub async fn issue(&self, key: &str) -> Result<Issue> {
        let refs = self.references().await?;
        self.hydrate_one(&refs, key).await
    }

    pub async fn create_issue(&self, new: NewIssue) -> Result<Issue> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(CircleError::EmptyTitle);
        }

        let refs = self.references().await?;
        let team = refs.team(&new.team)?;

        let status = match &new.status {
            Some(key) => refs.status(key)?,
            None => refs.first_status()?,
        };
        let priority = refs.priority(new.priority.unwrap_or(Priority::NoPriority))?;
        let assignee_id = new
            .assignee
            .as_deref()
            .map(|key| refs.user(key).map(|u| u.id.clone()))
            .transpose()?;
        let project_id = new
            .project
            .as_deref()
            .map(|key| refs.project(key).map(|p| p.id.clone()))
            .transpose()?;
        let label_ids = refs.label_ids(&new.labels)?;
        let parent_id = match &new.parent {
            Some(key) => Some(self.find_row(key).await?.id),
            None => None,
        };

        let team_rows = self
            .repo
            .list_issues(&IssueFilter {
                team_id: Some(team.id.clone()),
                ..IssueFilter::default()
            })
            .await?;
        let identifier = next_identifier(&team.key, &team_rows);

        let bucket = self.bucket(&status.id, None).await?;
        let rank = Rank::after(last_rank(&bucket));

        let now = Utc::now();
        let row = IssueRow {
            id: Uuid::new_v4().to_string(),
            identifier,
            team_id: team.id.clone(),
            title: title.to_string(),
            description: new.description.filter(|d| !d.trim().is_empty()),
            status_id: status.id.clone(),
            priority_id: priority.id.clone(),
            assignee_id,
            project_id,
            parent_id,
            rank,
            created_at: now,
            updated_at: now,
            label_ids,
        };

        self.repo.insert_issue(&row).await?;
        tracing::info!(identifier = %row.identifier, rank = %row.rank, status = %row.status_id, "issue created");

        self.hydrate_one(&refs, &row.id).await
    }

    pub async fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<Issue> {
        let refs = self.references().await?;
        let row = self.find_row(key).await?;

        let mut changes = IssueChanges::default();

        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(CircleError::EmptyTitle);
            }
            changes.title = Some(title.to_string());
        }
        if let Some(description) = update.description {
            changes.description = Some(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(priority) = update.priority {
            changes.priority_id = Some(refs.priority(priority)?.id.clone());
        }
        if let Some(assignee) = update.assignee {
            changes.assignee_id = Some(if assignee.eq_ignore_ascii_case(CLEAR) {
                None
            } else {
                Some(refs.user(&assignee)?.id.clone())
            });
        }
        if let Some(project) = update.project {
            changes.project_id = Some(if project.eq_ignore_ascii_case(CLEAR) {
                None
            } else {
                Some(refs.project(&project)?.id.clone())
            });
        }
        if let Some(labels) = update.labels {
            changes.label_ids = Some(refs.label_ids(&labels)?);
        }
        if let Some(status) = update.status {
            let status = refs.status(&status)?;
            if status.id != row.status_id {
                let bucket = self.bucket(&status.id, Some(&row.id)).await?;
                changes.status_id = Some(status.id.clone());
                changes.rank = Some(Rank::after(last_rank(&bucket)));
            }
        }

        if !changes.is_empty() {
            self.repo.update_issue(&row.id, &changes).await?;
            tracing::info!(identifier = %row.identifier, "issue updated");
        }

        self.hydrate_one(&refs, &row.id).await
    }

    /// Move an issue to `position` inside `status` (its current status when
    /// `None`). Only the moved issue's rank changes.
    pub async fn move_issue(
        &self,
        key: &str,
        status: Option<&str>,
        position: Position,
    ) -> Result<Issue> {
        let refs = self.references().await?;
        let row = self.find_row(key).await?;

        let target = match status {
            Some(key) => refs.status(key)?.id.clone(),
            None => row.status_id.clone(),
        };
        let siblings = self.bucket(&target, Some(&row.id)).await?;

        let neighbour = |anchor: &str| -> Result<usize> {
            siblings
                .iter()
                .position(|s| s.id == anchor || s.identifier.eq_ignore_ascii_case(anchor))
                .ok_or_else(|| {
                    if row.id == anchor || row.identifier.eq_ignore_ascii_case(anchor) {
                        CircleError::InvalidMove("cannot move an issue relative to itself".into())
                    } else {
                        CircleError::InvalidMove(format!("{anchor} is not in status {target}"))
                    }
                })
        };

        let (lower, upper) = match &position {
            Position::Top => (None, siblings.first()),
            Position::Bottom => (siblings.last(), None),
            Position::Before(anchor) => {
                let at = neighbour(anchor)?;
                (at.checked_sub(1).map(|i| &siblings[i]), Some(&siblings[at]))
            }
            Position::After(anchor) => {
                let at = neighbour(anchor)?;
                (Some(&siblings[at]), siblings.get(at + 1))
            }
        };

        let rank = rank::between(lower.map(|r| &r.rank), upper.map(|r| &r.rank))?;

        let changes = IssueChanges {
            status_id: (target != row.status_id).then(|| target.clone()),
            rank: Some(rank.clone()),
            ..IssueChanges::default()
        };
        self.repo.update_issue(&row.id, &changes).await?;
        tracing::info!(identifier = %row.identifier, status = %target, rank = %rank, "issue moved");

        self.hydrate_one(&refs, &row.id).await
    }

    pub async fn set_parent(&self, key: &str, parent_key: &str) -> Result<Issue> {
        let refs = self.references().await?;
        let child = self.find_row(key).await?;
        let parent = self.find_row(parent_key).await?;

        if child.id == parent.id {
            return Err(CircleError::InvalidParent(format!(
                "{} cannot be its own parent",
                child.identifier
            )));
        }

        let (_, index) = self.index().await?;
        if index.has_ancestor(&parent.id, &child.id) {
            return Err(CircleError::InvalidParent(format!(
                "{} is already below {}",
                parent.identifier, child.identifier
            )));
        }

        let changes = IssueChanges {
            parent_id: Some(Some(parent.id.clone())),
            ..IssueChanges::default()
        };
        self.repo.update_issue(&child.id, &changes).await?;
        tracing::info!(child = %child.identifier, parent = %parent.identifier, "parent set");

        self.hydrate_one(&refs, &child.id).await
    }

    pub async fn remove_parent(&self, key: &str) -> Result<Issue> {
        let refs = self.references().await?;
        let row = self.find_row(key).await?;

        if row.parent_id.is_some() {
            let changes = IssueChanges {
                parent_id: Some(None),
                ..IssueChanges::default()
            };
            self.repo.update_issue(&row.id, &changes).await?;
            tracing::info!(identifier = %row.identifier, "parent removed");
        }

        self.hydrate_one(&refs, &row.id).await
    }

    /// Delete an issue; sub-issues are kept and lose their parent.
    pub async fn delete_issue(&self, key: &str) -> Result<Issue> {
        let issue = self.issue(key).await?;
        self.repo.delete_issue(&issue.id).await?;
        tracing::info!(identifier = %issue.identifier, "issue deleted");
        Ok(issue)
    }

    /// Grouped counts with display names. Status and priority buckets follow
    /// display order; the rest are sorted by name.
    pub async fn counts(&self, kind: CountKind) -> Result<Vec<Count>> {
        let refs = self.references().await?;
        let raw = self.repo.count_issues(kind).await?;

        let mut counts: Vec<(i64, Count)> = raw
            .into_iter()
            .map(|(key, count)| {
                let (order, name) = match kind {
                    CountKind::Status => refs
                        .statuses
                        .iter()
                        .find(|s| s.id == key)
                        .map(|s| (s.display_order, s.name.clone()))
                        .unwrap_or((i64::MAX, key.clone())),
                    CountKind::Priority => refs
                        .priorities
                        .iter()
                        .find(|p| p.id == key)
                        .map(|p| (p.display_order, p.name.clone()))
                        .unwrap_or((i64::MAX, key.clone())),
                    CountKind::Assignee if key == UNASSIGNED => (0, "Unassigned".to_string()),
                    CountKind::Assignee => (
                        0,
                        refs.users
                            .iter()
                            .find(|u| u.id == key)
                            .map(|u| u.name.clone())
                            .unwrap_or_else(|| key.clone()),
                    ),
                    CountKind::Project if key == NO_PROJECT => (0, "No project".to_string()),
                    CountKind::Project => (
                        0,
                        refs.projects
                            .iter()
                            .find(|p| p.id == key)
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| key.clone()),
                    ),
                    CountKind::Label => (
                        0,
                        refs.labels
                            .iter()
                            .find(|l| l.id == key)
                            .map(|l| l.name.clone())
                            .unwrap_or_else(|| key.clone()),
                    ),
                };
                (order, Count { key, name, count })
            })
            .collect();

        counts.sort_by(|(a_order, a), (b_order, b)| {
            a_order.cmp(b_order).then_with(|| a.name.cmp(&b.name))
        });
        Ok(counts.into_iter().map(|(_, count)| count).collect())
    }

    /// A store loaded with reference data and the issues matching `query`.
    pub async fn load_store(&self, query: &IssueQuery) -> Result<Store> {
        let refs = self.references().await?;
        let issues = self.list_issues(query).await?;

        let mut store = Store::new();
        store.dispatch(Action::StatusesLoaded(if refs.statuses.is_empty() {
            default_statuses()
        } else {
            refs.statuses
        }));
        store.dispatch(Action::PrioritiesLoaded(refs.priorities));
        store.dispatch(Action::LabelsLoaded(refs.labels));
        store.dispatch(Action::UsersLoaded(refs.users));
        store.dispatch(Action::ProjectsLoaded(refs.projects));
        store.dispatch(Action::TeamsLoaded(refs.teams));
        store.dispatch(Action::IssuesLoaded(issues));
        if let Some(search) = &query.search {
            store.dispatch(Action::SearchChanged(search.clone()));
        }
        Ok(store)
    }

    /// Write reference data and demo issues. Demo issues are skipped when a
    /// different issue already holds their identifier.
    pub async fn seed(&self, data: &SeedData) -> Result<()> {
        let existing = self.repo.list_issues(&IssueFilter::default()).await?;
        let data = without_taken_identifiers(data, &existing);
        self.repo.seed(&data).await?;
        tracing::info!(
            statuses = data.statuses.len(),
            teams = data.teams.len(),
            issues = data.issues.len(),
            "seed data written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteRepository;
    use crate::seed::demo_data;

    async fn tracker() -> Tracker {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.migrate().unwrap();
        let tracker = Tracker::new(Box::new(repo));
        tracker.seed(&demo_data()).await.unwrap();
        tracker
    }

    async fn empty_tracker() -> Tracker {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.migrate().unwrap();
        let tracker = Tracker::new(Box::new(repo));
        let data = demo_data();
        tracker
            .seed(&SeedData {
                issues: Vec::new(),
                ..data
            })
            .await
            .unwrap();
        tracker
    }

    fn new_issue(title: &str) -> NewIssue {
        NewIssue {
            team: "ENG".to_string(),
            title: title.to_string(),
            ..NewIssue::default()
        }
    }

    async fn column(tracker: &Tracker, status: &str) -> Vec<String> {
        tracker
            .list_issues(&IssueQuery {
                status: Some(status.to_string()),
                sort: IssueSort::Rank,
                ..IssueQuery::default()
            })
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.identifier)
            .collect()
    }

    #[test]
    fn identifiers_continue_from_highest_number() {
        let now = Utc::now();
        let row = |identifier: &str| IssueRow {
            id: identifier.to_string(),
            identifier: identifier.to_string(),
            team_id: "t".to_string(),
            title: String::new(),
            description: None,
            status_id: "done".to_string(),
            priority_id: "low".to_string(),
            assignee_id: None,
            project_id: None,
            parent_id: None,
            rank: rank::initial(),
            created_at: now,
            updated_at: now,
            label_ids: Vec::new(),
        };

        assert_eq!(next_identifier("ENG", &[]), "ENG-1");
        assert_eq!(
            next_identifier("eng", &[row("ENG-2"), row("ENG-10"), row("ENG-9")]),
            "ENG-11"
        );
        assert_eq!(next_identifier("ENG", &[row("DES-40"), row("junk")]), "ENG-1");
    }

    #[tokio::test]
    async fn first_issue_gets_initial_rank_and_number_one() {
        let tracker = empty_tracker().await;

        let issue = tracker.create_issue(new_issue("First")).await.unwrap();

        assert_eq!(issue.identifier, "ENG-1");
        assert_eq!(issue.rank, rank::initial());
        assert_eq!(issue.status.id, "not-started");
        assert_eq!(issue.priority.id, "no-priority");
    }

    #[tokio::test]
    async fn created_issues_append_to_their_column() {
        let tracker = empty_tracker().await;

        let a = tracker.create_issue(new_issue("A")).await.unwrap();
        let b = tracker.create_issue(new_issue("B")).await.unwrap();
        let c = tracker.create_issue(new_issue("C")).await.unwrap();

        assert!(a.rank < b.rank && b.rank < c.rank);
        assert_eq!(b.identifier, "ENG-2");
        assert_eq!(column(&tracker, "not-started").await, vec!["ENG-1", "ENG-2", "ENG-3"]);
    }

    #[tokio::test]
    async fn create_resolves_references_by_name() {
        let tracker = empty_tracker().await;

        let issue = tracker
            .create_issue(NewIssue {
                status: Some("In Progress".to_string()),
                priority: Some(Priority::High),
                labels: vec!["bug".to_string(), "BUG".to_string()],
                ..new_issue("Crash on start")
            })
            .await
            .unwrap();

        assert_eq!(issue.status.id, "in-progress");
        assert_eq!(issue.priority.id, "high");
        assert_eq!(issue.labels.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_unknown_team_and_blank_title() {
        let tracker = empty_tracker().await;

        let unknown = tracker
            .create_issue(NewIssue {
                team: "NOPE".to_string(),
                ..new_issue("x")
            })
            .await;
        assert!(matches!(unknown, Err(CircleError::TeamNotFound(_))));

        let blank = tracker.create_issue(new_issue("   ")).await;
        assert!(matches!(blank, Err(CircleError::EmptyTitle)));
    }

    #[tokio::test]
    async fn create_without_statuses_fails() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.migrate().unwrap();
        let tracker = Tracker::new(Box::new(repo));
        let data = demo_data();
        let mut team = data.teams[0].clone();
        team.member_ids.clear();
        team.project_ids.clear();
        tracker
            .seed(&SeedData {
                teams: vec![team],
                priorities: data.priorities,
                ..SeedData::default()
            })
            .await
            .unwrap();

        let result = tracker.create_issue(new_issue("x")).await;
        assert!(matches!(result, Err(CircleError::NoStatuses)));
    }

    #[tokio::test]
    async fn move_between_neighbours_only_touches_moved_issue() {
        let tracker = empty_tracker().await;
        for title in ["A", "B", "C"] {
            tracker.create_issue(new_issue(title)).await.unwrap();
        }
        let before = tracker.issue("ENG-1").await.unwrap().rank;

        let moved = tracker
            .move_issue("ENG-3", None, Position::After("ENG-1".to_string()))
            .await
            .unwrap();

        assert_eq!(column(&tracker, "not-started").await, vec!["ENG-1", "ENG-3", "ENG-2"]);
        assert_eq!(tracker.issue("ENG-1").await.unwrap().rank, before);
        assert!(moved.rank > before);
    }

    #[tokio::test]
    async fn move_to_top_and_into_other_status() {
        let tracker = empty_tracker().await;
        for title in ["A", "B"] {
            tracker.create_issue(new_issue(title)).await.unwrap();
        }
        tracker
            .move_issue("ENG-2", None, Position::Top)
            .await
            .unwrap();
        assert_eq!(column(&tracker, "not-started").await, vec!["ENG-2", "ENG-1"]);

        let moved = tracker
            .move_issue("ENG-1", Some("done"), Position::Bottom)
            .await
            .unwrap();
        assert_eq!(moved.status.id, "done");
        assert_eq!(column(&tracker, "done").await, vec!["ENG-1"]);
        assert_eq!(column(&tracker, "not-started").await, vec!["ENG-2"]);
    }

    #[tokio::test]
    async fn move_relative_to_issue_in_other_column_fails() {
        let tracker = empty_tracker().await;
        tracker.create_issue(new_issue("A")).await.unwrap();
        tracker
            .create_issue(NewIssue {
                status: Some("done".to_string()),
                ..new_issue("B")
            })
            .await
            .unwrap();

        let result = tracker
            .move_issue("ENG-1", None, Position::Before("ENG-2".to_string()))
            .await;
        assert!(matches!(result, Err(CircleError::InvalidMove(_))));

        let itself = tracker
            .move_issue("ENG-1", None, Position::Before("ENG-1".to_string()))
            .await;
        assert!(matches!(itself, Err(CircleError::InvalidMove(_))));
    }

    #[tokio::test]
    async fn status_change_through_update_appends() {
        let tracker = empty_tracker().await;
        tracker
            .create_issue(NewIssue {
                status: Some("done".to_string()),
                ..new_issue("Already done")
            })
            .await
            .unwrap();
        tracker.create_issue(new_issue("Finishing")).await.unwrap();

        tracker
            .update_issue(
                "ENG-2",
                IssueUpdate {
                    status: Some("done".to_string()),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(column(&tracker, "done").await, vec!["ENG-1", "ENG-2"]);
    }

    #[tokio::test]
    async fn update_assigns_and_clears() {
        let tracker = empty_tracker().await;
        tracker.create_issue(new_issue("A")).await.unwrap();
        let user = tracker.references().await.unwrap().users[0].clone();

        let assigned = tracker
            .update_issue(
                "eng-1",
                IssueUpdate {
                    assignee: Some(user.name.clone()),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(assigned.assignee.map(|u| u.id), Some(user.id));

        let cleared = tracker
            .update_issue(
                "ENG-1",
                IssueUpdate {
                    assignee: Some("none".to_string()),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.assignee.is_none());
    }

    #[tokio::test]
    async fn parents_reject_self_and_cycles() {
        let tracker = empty_tracker().await;
        for title in ["Epic", "Story", "Task"] {
            tracker.create_issue(new_issue(title)).await.unwrap();
        }

        tracker.set_parent("ENG-2", "ENG-1").await.unwrap();
        tracker.set_parent("ENG-3", "ENG-2").await.unwrap();

        let epic = tracker.issue("ENG-1").await.unwrap();
        assert_eq!(epic.subissues, vec!["ENG-2".to_string()]);
        assert_eq!(tracker.issue("ENG-3").await.unwrap().parent.as_deref(), Some("ENG-2"));

        let own = tracker.set_parent("ENG-1", "ENG-1").await;
        assert!(matches!(own, Err(CircleError::InvalidParent(_))));

        let cycle = tracker.set_parent("ENG-1", "ENG-3").await;
        assert!(matches!(cycle, Err(CircleError::InvalidParent(_))));

        let detached = tracker.remove_parent("ENG-3").await.unwrap();
        assert!(detached.parent.is_none());
    }

    #[tokio::test]
    async fn delete_keeps_children() {
        let tracker = empty_tracker().await;
        tracker.create_issue(new_issue("Parent")).await.unwrap();
        tracker
            .create_issue(NewIssue {
                parent: Some("ENG-1".to_string()),
                ..new_issue("Child")
            })
            .await
            .unwrap();

        tracker.delete_issue("ENG-1").await.unwrap();

        assert!(matches!(
            tracker.issue("ENG-1").await,
            Err(CircleError::IssueNotFound(_))
        ));
        assert!(tracker.issue("ENG-2").await.unwrap().parent.is_none());
    }

    #[tokio::test]
    async fn reseed_skips_identifiers_taken_by_new_issues() {
        let tracker = tracker().await;
        tracker.delete_issue("ENG-7").await.unwrap();
        let created = tracker.create_issue(new_issue("Took the number")).await.unwrap();
        assert_eq!(created.identifier, "ENG-7");

        tracker.seed(&demo_data()).await.unwrap();

        let issue = tracker.issue("ENG-7").await.unwrap();
        assert_eq!(issue.id, created.id);
        assert_eq!(issue.title, "Took the number");
        let all = tracker.list_issues(&IssueQuery::default()).await.unwrap();
        assert_eq!(all.len(), demo_data().issues.len());
    }

    #[test]
    fn skipped_seed_parent_is_cleared_on_children() {
        let data = demo_data();
        let mut squatter = data
            .issues
            .iter()
            .find(|row| row.identifier == "ENG-4")
            .cloned()
            .unwrap();
        squatter.id = "issue-local".to_string();

        let kept = without_taken_identifiers(&data, &[squatter]);

        assert!(!kept.issues.iter().any(|row| row.identifier == "ENG-4"));
        let child = kept.issues.iter().find(|row| row.identifier == "ENG-5").unwrap();
        assert!(child.parent_id.is_none());
        assert_eq!(kept.issues.len(), data.issues.len() - 1);
    }

    #[tokio::test]
    async fn seeded_counts_sum_to_issue_total() {
        let tracker = tracker().await;
        let total = tracker
            .list_issues(&IssueQuery::default())
            .await
            .unwrap()
            .len() as u64;
        assert!(total > 0);

        for kind in [
            CountKind::Status,
            CountKind::Priority,
            CountKind::Assignee,
            CountKind::Project,
        ] {
            let counts = tracker.counts(kind).await.unwrap();
            assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), total, "{kind}");
        }

        let statuses = tracker.counts(CountKind::Status).await.unwrap();
        assert_eq!(statuses[0].key, "not-started");
    }

    #[tokio::test]
    async fn list_filters_and_searches() {
        let tracker = tracker().await;

        let urgent = tracker
            .list_issues(&IssueQuery {
                priority: Some(Priority::Urgent),
                ..IssueQuery::default()
            })
            .await
            .unwrap();
        assert!(urgent.iter().all(|i| i.priority.id == "urgent"));

        let searched = tracker
            .list_issues(&IssueQuery {
                search: Some("ENG-1".to_string()),
                ..IssueQuery::default()
            })
            .await
            .unwrap();
        assert!(searched.iter().any(|i| i.identifier == "ENG-1"));

        let missing = tracker
            .list_issues(&IssueQuery {
                label: Some("no-such-label".to_string()),
                ..IssueQuery::default()
            })
            .await;
        assert!(matches!(missing, Err(CircleError::LabelNotFound(_))));
    }

    #[tokio::test]
    async fn board_columns_follow_status_order() {
        let tracker = tracker().await;

        let store = tracker.load_store(&IssueQuery::default()).await.unwrap();
        let columns = store.state().columns();

        let ids: Vec<_> = columns.iter().map(|c| c.status.id.as_str()).collect();
        assert_eq!(ids, vec!["not-started", "in-progress", "done", "cancelled"]);
        for column in &columns {
            assert!(column.issues.windows(2).all(|w| w[0].rank < w[1].rank));
        }
    }
}
