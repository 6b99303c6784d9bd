use tabled::Tabled;

use circle::config::Config;
use circle::error::Result;
use circle::store::Column;
use circle::tracker::{IssueQuery, IssueSort, Tracker};
use circle::types::Issue;

use crate::cli::{BoardArgs, OutputFormat};
use crate::output::{self, priority_colored, status_colored, truncate};

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
}

impl From<&Issue> for CardRow {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.identifier.clone(),
            title: truncate(&issue.title, 60),
            priority: priority_colored(&issue.priority),
            assignee: issue
                .assignee
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_default(),
        }
    }
}

fn print_columns(columns: &[Column]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{} ({})", status_colored(&column.status), column.issues.len());

        if column.issues.is_empty() {
            println!("  No issues");
            continue;
        }

        let rows: Vec<CardRow> = column.issues.iter().map(CardRow::from).collect();
        println!("{}", output::render_table(rows));
    }
}

fn print_compact(columns: &[Column]) {
    for column in columns {
        let ids: Vec<&str> = column
            .issues
            .iter()
            .map(|issue| issue.identifier.as_str())
            .collect();
        println!("{}: {}", column.status.name, ids.join(" "));
    }
}

/// Issues grouped into status columns, each in rank order.
pub async fn show(tracker: &Tracker, config: &Config, args: BoardArgs) -> Result<()> {
    let query = IssueQuery {
        team: config.resolve_team(args.team.as_deref()),
        project: args.project,
        assignee: args.assignee,
        label: args.label,
        search: args.search,
        sort: IssueSort::Rank,
        ..IssueQuery::default()
    };

    let store = tracker.load_store(&query).await?;
    let columns = store.state().columns();

    match output::format() {
        OutputFormat::Compact => print_compact(&columns),
        _ => output::print_item(&columns, |columns| print_columns(columns)),
    }

    Ok(())
}
