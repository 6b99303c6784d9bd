use tabled::Tabled;

use circle::config::Config;
use circle::error::{CircleError, Result};
use circle::tracker::{IssueQuery, IssueUpdate, NewIssue, Position, Tracker};
use circle::types::Issue;

use crate::cli::{IssueCreateArgs, IssueListArgs, IssueMoveArgs, IssueUpdateArgs};
use crate::output::{self, format_date, format_relative, priority_colored, status_colored, truncate};

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Issue> for IssueRow {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.identifier.clone(),
            title: truncate(&issue.title, 50),
            status: status_colored(&issue.status),
            priority: priority_colored(&issue.priority),
            assignee: issue
                .assignee
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            updated: format_relative(&issue.updated_at),
        }
    }
}

fn compact(issue: &Issue) -> String {
    format!(
        "{} [{}] {} ({})",
        issue.identifier, issue.status.name, issue.title, issue.priority.name
    )
}

pub async fn list(tracker: &Tracker, config: &Config, args: IssueListArgs) -> Result<()> {
    let query = IssueQuery {
        team: config.resolve_team(args.team.as_deref()),
        status: args.status,
        priority: args.priority,
        project: args.project,
        assignee: args.assignee,
        label: args.label,
        search: args.search,
        sort: args.sort,
    };

    let mut issues = tracker.list_issues(&query).await?;
    if !args.all {
        issues.truncate(args.limit);
    }

    if issues.is_empty() && !output::is_json_output() {
        output::print_message("No issues found");
        return Ok(());
    }

    output::print_table(&issues, |i| IssueRow::from(i), compact);

    Ok(())
}

fn print_issue(issue: &Issue) {
    println!("{} - {}", issue.identifier, issue.title);
    println!();

    if let Some(desc) = &issue.description {
        println!("{desc}");
        println!();
    }

    println!("Status:   {}", status_colored(&issue.status));
    println!("Priority: {}", priority_colored(&issue.priority));
    println!(
        "Assignee: {}",
        issue.assignee.as_ref().map(|u| &u.name[..]).unwrap_or("-")
    );
    if let Some(project) = &issue.project {
        println!("Project:  {} {}", project.icon.glyph(), project.name);
    }
    if !issue.labels.is_empty() {
        let labels: Vec<String> = issue
            .labels
            .iter()
            .map(|l| output::label_colored(&l.name, &l.color))
            .collect();
        println!("Labels:   {}", labels.join(", "));
    }
    if let Some(parent) = &issue.parent {
        println!("Parent:   {parent}");
    }
    if !issue.subissues.is_empty() {
        println!("Children: {}", issue.subissues.join(", "));
    }
    println!("Rank:     {}", issue.rank);
    println!("Created:  {}", format_date(&issue.created_at));
    println!("Updated:  {}", format_date(&issue.updated_at));
}

pub async fn show(tracker: &Tracker, id: &str) -> Result<()> {
    let issue = tracker.issue(id).await?;
    output::print_item(&issue, print_issue);
    Ok(())
}

/// Print the changed issue in JSON mode, a one-line message otherwise.
fn report(issue: &Issue, message: String) {
    if output::is_json_output() {
        output::print_item(issue, |_| {});
    } else {
        output::print_message(&message);
    }
}

pub async fn create(tracker: &Tracker, config: &Config, args: IssueCreateArgs) -> Result<()> {
    let team = config
        .resolve_team(args.team.as_deref())
        .ok_or(CircleError::NoTeam)?;

    let issue = tracker
        .create_issue(NewIssue {
            team,
            title: args.title,
            description: args.description,
            status: args.status,
            priority: args.priority,
            assignee: args.assignee,
            project: args.project,
            labels: args.labels,
            parent: args.parent,
        })
        .await?;

    report(
        &issue,
        format!("Created {} - {}", issue.identifier, issue.title),
    );

    Ok(())
}

pub async fn update(tracker: &Tracker, args: IssueUpdateArgs) -> Result<()> {
    let labels = if args.clear_labels {
        Some(Vec::new())
    } else if args.labels.is_empty() {
        None
    } else {
        Some(args.labels)
    };

    let update = IssueUpdate {
        title: args.title,
        description: args.description,
        status: args.status,
        priority: args.priority,
        assignee: args.assignee,
        project: args.project,
        labels,
    };

    if update.is_empty() {
        output::print_message("No updates specified");
        return Ok(());
    }

    let issue = tracker.update_issue(&args.id, update).await?;
    report(
        &issue,
        format!("Updated {} - {}", issue.identifier, issue.title),
    );

    Ok(())
}

pub async fn move_issue(tracker: &Tracker, args: IssueMoveArgs) -> Result<()> {
    let position = match (args.before, args.after) {
        (Some(anchor), _) => Position::Before(anchor),
        (None, Some(anchor)) => Position::After(anchor),
        (None, None) if args.top => Position::Top,
        (None, None) => Position::Bottom,
    };

    let issue = tracker
        .move_issue(&args.id, args.status.as_deref(), position)
        .await?;
    report(
        &issue,
        format!(
            "Moved {} to {} (rank {})",
            issue.identifier, issue.status.name, issue.rank
        ),
    );

    Ok(())
}

pub async fn delete(tracker: &Tracker, id: &str) -> Result<()> {
    let issue = tracker.delete_issue(id).await?;
    output::print_message(&format!("Deleted {} - {}", issue.identifier, issue.title));
    Ok(())
}

/// Set the parent of an issue.
pub async fn set_parent(tracker: &Tracker, id: &str, parent_id: &str) -> Result<()> {
    let issue = tracker.set_parent(id, parent_id).await?;
    report(
        &issue,
        format!(
            "Set {} as parent of {}",
            issue.parent.as_deref().unwrap_or(parent_id),
            issue.identifier
        ),
    );
    Ok(())
}

/// Remove the parent from an issue.
pub async fn remove_parent(tracker: &Tracker, id: &str) -> Result<()> {
    let issue = tracker.remove_parent(id).await?;
    report(&issue, format!("Removed parent from {}", issue.identifier));
    Ok(())
}
