//! Demo workspace written by `circle db seed`.

use chrono::{DateTime, NaiveDate, Utc};

use crate::rank::{self, Rank};
use crate::repository::{IssueRow, SeedData};
use crate::types::{default_priorities, default_statuses, Icon, Label, Project, Team, User};

fn label(id: &str, name: &str, color: &str) -> Label {
    Label {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    }
}

fn user(id: &str, name: &str, email: &str, role: &str, team_ids: &[&str]) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(email.to_string()),
        avatar_url: None,
        role: Some(role.to_string()),
        team_ids: team_ids.iter().map(|t| t.to_string()).collect(),
    }
}

fn project(id: &str, name: &str, icon: Icon, status_id: &str, percent_complete: f64) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        icon,
        status_id: Some(status_id.to_string()),
        percent_complete,
    }
}

fn day(month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, month, day)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

struct DemoIssue {
    identifier: &'static str,
    title: &'static str,
    status: &'static str,
    priority: &'static str,
    assignee: Option<&'static str>,
    project: Option<&'static str>,
    labels: &'static [&'static str],
    parent: Option<&'static str>,
    created: (u32, u32),
}

const DEMO_ISSUES: &[DemoIssue] = &[
    DemoIssue {
        identifier: "ENG-1",
        title: "Refactor button component for accessibility",
        status: "in-progress",
        priority: "medium",
        assignee: Some("user-mira"),
        project: Some("proj-core"),
        labels: &["ui", "accessibility"],
        parent: None,
        created: (3, 8),
    },
    DemoIssue {
        identifier: "ENG-2",
        title: "Smooth out panel transition animations",
        status: "not-started",
        priority: "high",
        assignee: Some("user-jonas"),
        project: Some("proj-core"),
        labels: &["performance"],
        parent: None,
        created: (3, 12),
    },
    DemoIssue {
        identifier: "ENG-3",
        title: "Follow the system setting for dark mode",
        status: "done",
        priority: "high",
        assignee: Some("user-jonas"),
        project: Some("proj-theme"),
        labels: &["feature"],
        parent: None,
        created: (3, 14),
    },
    DemoIssue {
        identifier: "ENG-4",
        title: "Trap focus inside modal dialogs",
        status: "not-started",
        priority: "urgent",
        assignee: None,
        project: Some("proj-modal"),
        labels: &["accessibility", "bug"],
        parent: None,
        created: (3, 9),
    },
    DemoIssue {
        identifier: "ENG-5",
        title: "Close modal on escape key",
        status: "not-started",
        priority: "low",
        assignee: Some("user-mira"),
        project: Some("proj-modal"),
        labels: &["ui"],
        parent: Some("ENG-4"),
        created: (3, 10),
    },
    DemoIssue {
        identifier: "ENG-6",
        title: "Document theme tokens",
        status: "cancelled",
        priority: "no-priority",
        assignee: None,
        project: None,
        labels: &["documentation"],
        parent: None,
        created: (3, 2),
    },
    DemoIssue {
        identifier: "ENG-7",
        title: "Sanitize markdown in issue descriptions",
        status: "in-progress",
        priority: "urgent",
        assignee: Some("user-sol"),
        project: None,
        labels: &["security", "bug"],
        parent: None,
        created: (3, 16),
    },
    DemoIssue {
        identifier: "DES-1",
        title: "Icon set for project states",
        status: "done",
        priority: "medium",
        assignee: Some("user-ana"),
        project: Some("proj-theme"),
        labels: &["design"],
        parent: None,
        created: (3, 5),
    },
    DemoIssue {
        identifier: "DES-2",
        title: "Navigation bar layout on narrow screens",
        status: "in-progress",
        priority: "high",
        assignee: Some("user-ana"),
        project: Some("proj-nav"),
        labels: &["design", "ui"],
        parent: None,
        created: (3, 11),
    },
    DemoIssue {
        identifier: "DES-3",
        title: "Translate onboarding copy",
        status: "not-started",
        priority: "low",
        assignee: None,
        project: Some("proj-nav"),
        labels: &["internationalization"],
        parent: None,
        created: (3, 18),
    },
];

fn team_id_for(identifier: &str) -> &'static str {
    if identifier.starts_with("DES-") {
        "team-des"
    } else {
        "team-eng"
    }
}

fn issue_id(identifier: &str) -> String {
    format!("issue-{}", identifier.to_ascii_lowercase())
}

/// Reference data plus a small set of issues spread over two teams. Issue
/// ranks are consecutive increments from the initial rank.
pub fn demo_data() -> SeedData {
    let labels = vec![
        label("ui", "UI", "purple"),
        label("bug", "Bug", "red"),
        label("feature", "Feature", "green"),
        label("documentation", "Documentation", "blue"),
        label("refactor", "Refactor", "yellow"),
        label("performance", "Performance", "orange"),
        label("design", "Design", "pink"),
        label("security", "Security", "gray"),
        label("accessibility", "Accessibility", "indigo"),
        label("testing", "Testing", "teal"),
        label("internationalization", "Internationalization", "cyan"),
    ];

    let users = vec![
        user("user-mira", "Mira Okafor", "mira@circle.dev", "admin", &["team-eng"]),
        user("user-jonas", "Jonas Lind", "jonas@circle.dev", "member", &["team-eng"]),
        user("user-sol", "Sol Reyes", "sol@circle.dev", "member", &["team-eng", "team-des"]),
        user("user-ana", "Ana Petrova", "ana@circle.dev", "admin", &["team-des"]),
    ];

    let projects = vec![
        project("proj-core", "Core components", Icon::Folder, "in-progress", 80.0),
        project("proj-theme", "Theming", Icon::Folder, "done", 100.0),
        project("proj-modal", "Modal system", Icon::Folder, "not-started", 0.0),
        project("proj-nav", "Navigation", Icon::Folder, "in-progress", 35.0),
    ];

    let teams = vec![
        Team {
            id: "team-eng".to_string(),
            key: "ENG".to_string(),
            name: "Engineering".to_string(),
            icon: Some("users".to_string()),
            color: Some("#6366F1".to_string()),
            member_ids: vec![
                "user-mira".to_string(),
                "user-jonas".to_string(),
                "user-sol".to_string(),
            ],
            project_ids: vec![
                "proj-core".to_string(),
                "proj-theme".to_string(),
                "proj-modal".to_string(),
            ],
        },
        Team {
            id: "team-des".to_string(),
            key: "DES".to_string(),
            name: "Design".to_string(),
            icon: Some("users".to_string()),
            color: Some("#EC4899".to_string()),
            member_ids: vec!["user-ana".to_string(), "user-sol".to_string()],
            project_ids: vec!["proj-theme".to_string(), "proj-nav".to_string()],
        },
    ];

    let mut next_rank = rank::initial();
    let mut issues: Vec<IssueRow> = Vec::with_capacity(DEMO_ISSUES.len());
    for demo in DEMO_ISSUES {
        let created = day(demo.created.0, demo.created.1);
        let rank: Rank = next_rank.clone();
        next_rank = next_rank.increment();

        issues.push(IssueRow {
            id: issue_id(demo.identifier),
            identifier: demo.identifier.to_string(),
            team_id: team_id_for(demo.identifier).to_string(),
            title: demo.title.to_string(),
            description: None,
            status_id: demo.status.to_string(),
            priority_id: demo.priority.to_string(),
            assignee_id: demo.assignee.map(str::to_string),
            project_id: demo.project.map(str::to_string),
            parent_id: demo.parent.map(issue_id),
            rank,
            created_at: created,
            updated_at: created,
            label_ids: demo.labels.iter().map(|l| l.to_string()).collect(),
        });
    }

    SeedData {
        statuses: default_statuses(),
        priorities: default_priorities(),
        labels,
        users,
        projects,
        teams,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_references_are_consistent() {
        let data = demo_data();

        for issue in &data.issues {
            assert!(data.statuses.iter().any(|s| s.id == issue.status_id));
            assert!(data.priorities.iter().any(|p| p.id == issue.priority_id));
            for label_id in &issue.label_ids {
                assert!(data.labels.iter().any(|l| &l.id == label_id), "{label_id}");
            }
            if let Some(parent) = &issue.parent_id {
                assert!(data.issues.iter().any(|i| &i.id == parent));
            }
        }
    }

    #[test]
    fn demo_ranks_increase_in_seed_order() {
        let data = demo_data();
        assert_eq!(data.issues[0].rank, rank::initial());
        assert!(data.issues.windows(2).all(|w| w[0].rank < w[1].rank));
    }
}
