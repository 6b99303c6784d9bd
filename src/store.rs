//! Session state for the issue views.
//!
//! State is an immutable [`AppState`] value; every change goes through
//! [`reduce`], which returns the next state. [`Store`] holds the current
//! snapshot and swaps it whole on each dispatch, so readers never see a
//! half-applied action.

use std::sync::Arc;

use serde::Serialize;

use crate::issues::{group_by_status, sort_by_rank};
use crate::types::{Issue, Label, PriorityInfo, Project, Status, Team, User};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub issues: Vec<Issue>,
    pub statuses: Vec<Status>,
    pub priorities: Vec<PriorityInfo>,
    pub labels: Vec<Label>,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub teams: Vec<Team>,
    pub search: String,
}

#[derive(Debug, Clone)]
pub enum Action {
    IssuesLoaded(Vec<Issue>),
    StatusesLoaded(Vec<Status>),
    PrioritiesLoaded(Vec<PriorityInfo>),
    LabelsLoaded(Vec<Label>),
    UsersLoaded(Vec<User>),
    ProjectsLoaded(Vec<Project>),
    TeamsLoaded(Vec<Team>),
    /// A created or changed issue as returned by storage.
    IssueSaved(Issue),
    IssueRemoved { id: String },
    SearchChanged(String),
    Reset,
}

/// One status column of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub status: Status,
    pub issues: Vec<Issue>,
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::IssuesLoaded(issues) => next.issues = issues,
        Action::StatusesLoaded(mut statuses) => {
            statuses.sort_by_key(|s| s.display_order);
            next.statuses = statuses;
        }
        Action::PrioritiesLoaded(mut priorities) => {
            priorities.sort_by_key(|p| p.display_order);
            next.priorities = priorities;
        }
        Action::LabelsLoaded(labels) => next.labels = labels,
        Action::UsersLoaded(users) => next.users = users,
        Action::ProjectsLoaded(projects) => next.projects = projects,
        Action::TeamsLoaded(teams) => next.teams = teams,
        Action::IssueSaved(issue) => match next.issues.iter_mut().find(|i| i.id == issue.id) {
            Some(existing) => *existing = issue,
            None => next.issues.push(issue),
        },
        Action::IssueRemoved { id } => next.issues.retain(|i| i.id != id),
        Action::SearchChanged(term) => next.search = term,
        Action::Reset => next = AppState::default(),
    }
    next
}

impl AppState {
    /// Board columns: known statuses in display order (empty ones included),
    /// then any status ids only seen on issues. Each column is rank-ordered.
    pub fn columns(&self) -> Vec<Column> {
        let mut grouped = group_by_status(&self.issues);

        let mut columns: Vec<Column> = self
            .statuses
            .iter()
            .map(|status| Column {
                status: status.clone(),
                issues: grouped
                    .remove(&status.id)
                    .map(|issues| sort_by_rank(&issues))
                    .unwrap_or_default(),
            })
            .collect();

        for (_, issues) in grouped {
            let status = issues[0].status.clone();
            columns.push(Column {
                status,
                issues: sort_by_rank(&issues),
            });
        }

        columns
    }

    /// Issues matching the current search term, in stored order.
    pub fn search_results(&self) -> Vec<Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.matches_search(&self.search))
            .cloned()
            .collect()
    }

    pub fn issue(&self, identifier: &str) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|i| i.identifier.eq_ignore_ascii_case(identifier) || i.id == identifier)
    }
}

#[derive(Debug, Default)]
pub struct Store {
    state: Arc<AppState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::debug!(?action, "store dispatch");
        self.state = Arc::new(reduce(&self.state, action));
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::fixtures::{issue, issue_ranked};
    use crate::types::default_statuses;

    #[test]
    fn load_replaces_issue_list_wholesale() {
        let state = reduce(
            &AppState::default(),
            Action::IssuesLoaded(vec![issue("1", "done", "low")]),
        );
        let state = reduce(
            &state,
            Action::IssuesLoaded(vec![issue("2", "done", "low"), issue("3", "done", "low")]),
        );

        let ids: Vec<_> = state.issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn reduce_leaves_previous_state_untouched() {
        let before = AppState::default();
        let after = reduce(&before, Action::SearchChanged("login".to_string()));

        assert_eq!(before.search, "");
        assert_eq!(after.search, "login");
    }

    #[test]
    fn saved_issue_replaces_or_appends() {
        let state = reduce(
            &AppState::default(),
            Action::IssuesLoaded(vec![issue("1", "not-started", "low")]),
        );

        let mut changed = issue("1", "done", "low");
        changed.title = "Renamed".to_string();
        let state = reduce(&state, Action::IssueSaved(changed));
        let state = reduce(&state, Action::IssueSaved(issue("2", "done", "high")));

        assert_eq!(state.issues.len(), 2);
        assert_eq!(state.issues[0].title, "Renamed");
        assert_eq!(state.issues[1].id, "2");

        let state = reduce(&state, Action::IssueRemoved { id: "1".to_string() });
        assert_eq!(state.issues.len(), 1);
    }

    #[test]
    fn columns_follow_status_order_and_rank() {
        let mut store = Store::new();
        store.dispatch(Action::StatusesLoaded(default_statuses().into_iter().rev().collect()));
        store.dispatch(Action::IssuesLoaded(vec![
            issue_ranked("1", "done", "low", "a3e"),
            issue_ranked("2", "not-started", "low", "a3d"),
            issue_ranked("3", "done", "low", "a3c"),
            issue_ranked("4", "triage", "low", "a3c"),
        ]));

        let columns = store.state().columns();
        let names: Vec<_> = columns.iter().map(|c| c.status.id.as_str()).collect();
        assert_eq!(
            names,
            vec!["not-started", "in-progress", "done", "cancelled", "triage"]
        );

        let done: Vec<_> = columns[2].issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(done, vec!["3", "1"]);
        assert!(columns[1].issues.is_empty());
    }

    #[test]
    fn search_matches_identifier_and_title() {
        let mut store = Store::new();
        let mut login = issue("1", "done", "low");
        login.title = "Fix login redirect".to_string();
        store.dispatch(Action::IssuesLoaded(vec![login, issue("2", "done", "low")]));

        store.dispatch(Action::SearchChanged("LOGIN".to_string()));
        assert_eq!(store.state().search_results().len(), 1);

        store.dispatch(Action::SearchChanged("eng-2".to_string()));
        assert_eq!(store.state().search_results()[0].id, "2");

        store.dispatch(Action::SearchChanged(String::new()));
        assert_eq!(store.state().search_results().len(), 2);
    }

    #[test]
    fn snapshots_survive_later_dispatches() {
        let mut store = Store::new();
        store.dispatch(Action::IssuesLoaded(vec![issue("1", "done", "low")]));
        let snapshot = store.state();

        store.dispatch(Action::Reset);

        assert_eq!(snapshot.issues.len(), 1);
        assert!(store.state().issues.is_empty());
    }
}
