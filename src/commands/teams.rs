use tabled::Tabled;

use circle::error::Result;
use circle::tracker::Tracker;
use circle::types::Team;

use crate::output;

#[derive(Tabled)]
struct TeamRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Projects")]
    projects: usize,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        Self {
            key: team.key.clone(),
            name: team.name.clone(),
            members: team.member_ids.len(),
            projects: team.project_ids.len(),
            id: team.id.clone(),
        }
    }
}

pub async fn list(tracker: &Tracker) -> Result<()> {
    let teams = tracker.repository().list_teams().await?;

    if teams.is_empty() && !output::is_json_output() {
        output::print_message("No teams found. Run `circle db seed` to create a demo workspace");
        return Ok(());
    }

    output::print_table(
        &teams,
        |t| TeamRow::from(t),
        |t| format!("{} {}", t.key, t.name),
    );

    Ok(())
}
