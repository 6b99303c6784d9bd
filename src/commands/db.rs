use colored::Colorize;
use tabled::Tabled;

use circle::config::{Backend, Config};
use circle::error::{CircleError, Result};
use circle::repository::sqlite::MigrationStatus;
use circle::repository::SqliteRepository;
use circle::seed::demo_data;
use circle::tracker::Tracker;

use crate::output;

#[derive(Tabled)]
struct MigrationRow {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&MigrationStatus> for MigrationRow {
    fn from(migration: &MigrationStatus) -> Self {
        let state = if migration.applied {
            "applied".green().to_string()
        } else {
            "pending".yellow().to_string()
        };
        Self {
            name: migration.name.clone(),
            state,
        }
    }
}

/// Open the local database without applying anything.
fn local_database(config: &Config, operation: &'static str) -> Result<SqliteRepository> {
    match config.backend()? {
        Backend::Local => SqliteRepository::open(&config.database_path()?),
        backend => Err(CircleError::Unsupported { operation, backend }),
    }
}

pub fn migrate(config: &Config) -> Result<()> {
    let repo = local_database(config, "db migrate")?;
    let applied = repo.migrate()?;

    if output::is_json_output() {
        output::print_item(&applied, |_| {});
    } else if applied.is_empty() {
        output::print_message("Database is up to date");
    } else {
        for name in &applied {
            output::print_message(&format!("Applied {name}"));
        }
    }

    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let repo = local_database(config, "db status")?;
    let migrations = repo.migration_status()?;

    output::print_table(
        &migrations,
        |m| MigrationRow::from(m),
        |m| format!("{} {}", if m.applied { "+" } else { "-" }, m.name),
    );

    Ok(())
}

pub async fn seed(tracker: &Tracker) -> Result<()> {
    let data = demo_data();
    tracker.seed(&data).await?;

    output::print_message(&format!(
        "Seeded {} statuses, {} priorities, {} teams and {} issues",
        data.statuses.len(),
        data.priorities.len(),
        data.teams.len(),
        data.issues.len()
    ));

    Ok(())
}
