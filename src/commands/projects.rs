use tabled::Tabled;

use circle::config::Config;
use circle::error::Result;
use circle::tracker::Tracker;
use circle::types::{Project, Status};

use crate::output::{self, status_colored};

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl ProjectRow {
    fn new(project: &Project, statuses: &[Status]) -> Self {
        let status = project
            .status_id
            .as_deref()
            .and_then(|id| statuses.iter().find(|s| s.id == id))
            .map(status_colored)
            .unwrap_or_default();

        Self {
            name: format!("{} {}", project.icon.glyph(), project.name),
            status,
            progress: format!("{:.0}%", project.percent_complete),
            id: project.id.clone(),
        }
    }
}

pub async fn list(tracker: &Tracker, config: &Config, team: Option<String>) -> Result<()> {
    let refs = tracker.references().await?;

    let projects: Vec<Project> = match config.resolve_team(team.as_deref()) {
        Some(key) => {
            let team = refs.team(&key)?;
            refs.projects
                .iter()
                .filter(|p| team.project_ids.contains(&p.id))
                .cloned()
                .collect()
        }
        None => refs.projects.clone(),
    };

    if projects.is_empty() && !output::is_json_output() {
        output::print_message("No projects found");
        return Ok(());
    }

    output::print_table(
        &projects,
        |p| ProjectRow::new(p, &refs.statuses),
        |p| format!("{} ({:.0}%)", p.name, p.percent_complete),
    );

    Ok(())
}
