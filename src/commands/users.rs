use tabled::Tabled;

use circle::error::Result;
use circle::tracker::Tracker;
use circle::types::{Team, User};

use crate::output;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Teams")]
    teams: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl UserRow {
    fn new(user: &User, teams: &[Team]) -> Self {
        let keys: Vec<&str> = user
            .team_ids
            .iter()
            .filter_map(|id| teams.iter().find(|t| &t.id == id))
            .map(|t| t.key.as_str())
            .collect();

        Self {
            name: user.name.clone(),
            email: user.email.clone().unwrap_or_default(),
            role: user.role.clone().unwrap_or_default(),
            teams: keys.join(", "),
            id: user.id.clone(),
        }
    }
}

pub async fn list(tracker: &Tracker, team: Option<String>) -> Result<()> {
    let refs = tracker.references().await?;

    let users: Vec<User> = match team {
        Some(key) => {
            let team = refs.team(&key)?;
            refs.users
                .iter()
                .filter(|u| team.member_ids.contains(&u.id))
                .cloned()
                .collect()
        }
        None => refs.users.clone(),
    };

    if users.is_empty() && !output::is_json_output() {
        output::print_message("No users found");
        return Ok(());
    }

    output::print_table(
        &users,
        |u| UserRow::new(u, &refs.teams),
        |u| match &u.email {
            Some(email) => format!("{} <{email}>", u.name),
            None => u.name.clone(),
        },
    );

    Ok(())
}
