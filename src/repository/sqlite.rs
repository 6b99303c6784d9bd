//! Local SQLite adapter.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;

use super::{
    CountKind, IssueChanges, IssueFilter, IssueRepository, IssueRow, SeedData, NO_PROJECT,
    UNASSIGNED,
};
use crate::config::Backend;
use crate::error::{CircleError, Result};
use crate::rank::Rank;
use crate::types::{
    Icon, Label, PriorityInfo, Project, Status, Team, User, DEFAULT_LABEL_COLOR,
    DEFAULT_STATUS_COLOR,
};

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Embedded migrations, applied in order. Names follow
/// `YYYYMMDDHHMMSS_description`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "20250101000000_create_core_tables",
        sql: r#"
        CREATE TABLE statuses (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT,
            icon TEXT,
            display_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE priorities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            icon TEXT,
            display_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE labels (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT
        );

        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            avatar_url TEXT,
            role TEXT
        );

        CREATE TABLE teams (
            id TEXT PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            icon TEXT,
            color TEXT
        );

        CREATE TABLE team_members (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (team_id, user_id)
        );

        CREATE TABLE projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            icon TEXT,
            status_id TEXT REFERENCES statuses(id),
            percent_complete REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE team_projects (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            PRIMARY KEY (team_id, project_id)
        );

        CREATE TABLE issues (
            id TEXT PRIMARY KEY,
            identifier TEXT NOT NULL UNIQUE,
            team_id TEXT NOT NULL REFERENCES teams(id),
            title TEXT NOT NULL,
            description TEXT,
            status_id TEXT NOT NULL REFERENCES statuses(id),
            priority_id TEXT NOT NULL REFERENCES priorities(id),
            assignee_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            project_id TEXT REFERENCES projects(id) ON DELETE SET NULL,
            parent_id TEXT REFERENCES issues(id) ON DELETE SET NULL,
            rank TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE issue_labels (
            issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            label_id TEXT NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
            PRIMARY KEY (issue_id, label_id)
        );
        "#,
    },
    Migration {
        name: "20250115000000_index_issue_lookups",
        sql: r#"
        CREATE INDEX idx_issues_status_rank ON issues(status_id, rank);
        CREATE INDEX idx_issues_team ON issues(team_id);
        CREATE INDEX idx_issues_parent ON issues(parent_id);
        CREATE INDEX idx_issue_labels_label ON issue_labels(label_id);
        "#,
    },
];

const ISSUE_COLUMNS: &str = "id, identifier, team_id, title, description, status_id, priority_id, \
     assignee_id, project_id, parent_id, rank, created_at, updated_at";

/// Applied or pending state of one embedded migration.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: String,
    pub applied: bool,
}

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (creating if needed) a database file. Migrations are not applied;
    /// call [`SqliteRepository::migrate`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        tracing::debug!(path = %path.display(), "opened sqlite database");

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_migrations_table(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                executed_at TEXT DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
        Self::ensure_migrations_table(conn)?;
        let mut stmt = conn.prepare("SELECT name FROM migrations ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        let conn = self.conn();
        let applied = Self::applied_migrations(&conn)?;

        Ok(MIGRATIONS
            .iter()
            .map(|m| MigrationStatus {
                name: m.name.to_string(),
                applied: applied.iter().any(|name| name == m.name),
            })
            .collect())
    }

    /// Apply pending migrations, each in its own transaction. Returns the
    /// names applied by this call.
    pub fn migrate(&self) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let applied = Self::applied_migrations(&conn)?;
        let mut newly_applied = Vec::new();

        for migration in MIGRATIONS {
            if applied.iter().any(|name| name == migration.name) {
                continue;
            }

            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|source| CircleError::Migration {
                    name: migration.name.to_string(),
                    source,
                })?;
            tx.execute(
                "INSERT INTO migrations (name) VALUES (?1)",
                [migration.name],
            )?;
            tx.commit()?;

            tracing::info!(migration = migration.name, "migration applied");
            newly_applied.push(migration.name.to_string());
        }

        Ok(newly_applied)
    }

    fn label_links(conn: &Connection) -> Result<HashMap<String, Vec<String>>> {
        let mut stmt =
            conn.prepare("SELECT issue_id, label_id FROM issue_labels ORDER BY label_id")?;
        let mut links: HashMap<String, Vec<String>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (issue_id, label_id) = row?;
            links.entry(issue_id).or_default().push(label_id);
        }
        Ok(links)
    }

    fn replace_labels(tx: &Transaction<'_>, issue_id: &str, label_ids: &[String]) -> Result<()> {
        tx.execute("DELETE FROM issue_labels WHERE issue_id = ?1", [issue_id])?;
        for label_id in label_ids {
            tx.execute(
                "INSERT OR IGNORE INTO issue_labels (issue_id, label_id) VALUES (?1, ?2)",
                params![issue_id, label_id],
            )?;
        }
        Ok(())
    }

    fn insert_issue_row(tx: &Transaction<'_>, row: &IssueRow) -> Result<()> {
        tx.execute(
            &format!(
                "INSERT INTO issues ({ISSUE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    status_id = excluded.status_id,
                    priority_id = excluded.priority_id,
                    assignee_id = excluded.assignee_id,
                    project_id = excluded.project_id,
                    parent_id = excluded.parent_id,
                    rank = excluded.rank,
                    updated_at = excluded.updated_at"
            ),
            params![
                row.id,
                row.identifier,
                row.team_id,
                row.title,
                row.description,
                row.status_id,
                row.priority_id,
                row.assignee_id,
                row.project_id,
                row.parent_id,
                row.rank,
                row.created_at.to_rfc3339(),
                row.updated_at.to_rfc3339(),
            ],
        )?;
        Self::replace_labels(tx, &row.id, &row.label_ids)
    }
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<IssueRow> {
    Ok(IssueRow {
        id: row.get(0)?,
        identifier: row.get(1)?,
        team_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status_id: row.get(5)?,
        priority_id: row.get(6)?,
        assignee_id: row.get(7)?,
        project_id: row.get(8)?,
        parent_id: row.get(9)?,
        rank: row.get(10)?,
        created_at: timestamp(row, 11)?,
        updated_at: timestamp(row, 12)?,
        label_ids: Vec::new(),
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn icon_column(raw: Option<String>) -> Icon {
    raw.as_deref().map(Icon::from_name).unwrap_or_default()
}

impl ToSql for Rank {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Rank {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Rank::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[async_trait]
impl IssueRepository for SqliteRepository {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    async fn list_statuses(&self) -> Result<Vec<Status>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, color, icon, display_order FROM statuses
             ORDER BY display_order ASC, id ASC",
        )?;
        let statuses = stmt
            .query_map([], |row| {
                Ok(Status {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row
                        .get::<_, Option<String>>(2)?
                        .unwrap_or_else(|| DEFAULT_STATUS_COLOR.to_string()),
                    icon: icon_column(row.get(3)?),
                    display_order: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(statuses)
    }

    async fn list_priorities(&self) -> Result<Vec<PriorityInfo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, icon, display_order FROM priorities
             ORDER BY display_order ASC, id ASC",
        )?;
        let priorities = stmt
            .query_map([], |row| {
                Ok(PriorityInfo {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: icon_column(row.get(2)?),
                    display_order: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(priorities)
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, color FROM labels ORDER BY name ASC")?;
        let labels = stmt
            .query_map([], |row| {
                Ok(Label {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row
                        .get::<_, Option<String>>(2)?
                        .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();

        let mut memberships: HashMap<String, Vec<String>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT user_id, team_id FROM team_members ORDER BY team_id")?;
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (user_id, team_id) = row?;
            memberships.entry(user_id).or_default().push(team_id);
        }

        let mut stmt = conn.prepare(
            "SELECT id, name, email, avatar_url, role FROM users ORDER BY name ASC",
        )?;
        let users = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                Ok(User {
                    team_ids: memberships.get(&id).cloned().unwrap_or_default(),
                    id,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    avatar_url: row.get(3)?,
                    role: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();

        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT team_id, user_id FROM team_members ORDER BY user_id")?;
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (team_id, user_id) = row?;
            members.entry(team_id).or_default().push(user_id);
        }

        let mut projects: HashMap<String, Vec<String>> = HashMap::new();
        let mut stmt =
            conn.prepare("SELECT team_id, project_id FROM team_projects ORDER BY project_id")?;
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (team_id, project_id) = row?;
            projects.entry(team_id).or_default().push(project_id);
        }

        let mut stmt = conn.prepare("SELECT id, key, name, icon, color FROM teams ORDER BY name ASC")?;
        let teams = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                Ok(Team {
                    member_ids: members.get(&id).cloned().unwrap_or_default(),
                    project_ids: projects.get(&id).cloned().unwrap_or_default(),
                    id,
                    key: row.get(1)?,
                    name: row.get(2)?,
                    icon: row.get(3)?,
                    color: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, icon, status_id, percent_complete FROM projects ORDER BY name ASC",
        )?;
        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: row
                        .get::<_, Option<String>>(2)?
                        .map(|name| Icon::from_name(&name))
                        .unwrap_or(Icon::Folder),
                    status_id: row.get(3)?,
                    percent_complete: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRow>> {
        let conn = self.conn();

        let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1=1");
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        let columns = [
            ("team_id", &filter.team_id),
            ("status_id", &filter.status_id),
            ("priority_id", &filter.priority_id),
            ("project_id", &filter.project_id),
            ("assignee_id", &filter.assignee_id),
            ("parent_id", &filter.parent_id),
        ];
        for (column, value) in columns {
            if let Some(value) = value {
                sql.push_str(&format!(" AND {column} = ?"));
                params_vec.push(Box::new(value.clone()));
            }
        }
        if let Some(label_id) = &filter.label_id {
            sql.push_str(" AND id IN (SELECT issue_id FROM issue_labels WHERE label_id = ?)");
            params_vec.push(Box::new(label_id.clone()));
        }

        sql.push_str(" ORDER BY created_at DESC, identifier DESC");

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
            .query_map(params_refs.as_slice(), issue_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut links = Self::label_links(&conn)?;
        for row in &mut rows {
            row.label_ids = links.remove(&row.id).unwrap_or_default();
        }

        Ok(rows)
    }

    async fn find_issue(&self, key: &str) -> Result<Option<IssueRow>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {ISSUE_COLUMNS} FROM issues
                     WHERE id = ?1 OR upper(identifier) = upper(?1)"
                ),
                [key],
                issue_from_row,
            )
            .optional()?;

        let Some(mut row) = row else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT label_id FROM issue_labels WHERE issue_id = ?1 ORDER BY label_id")?;
        row.label_ids = stmt
            .query_map([&row.id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some(row))
    }

    async fn insert_issue(&self, row: &IssueRow) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        Self::insert_issue_row(&tx, row)?;
        tx.commit()?;
        Ok(())
    }

    async fn update_issue(&self, id: &str, changes: &IssueChanges) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut assignments = vec!["updated_at = ?".to_string()];
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(Utc::now().to_rfc3339())];

        if let Some(title) = &changes.title {
            assignments.push("title = ?".to_string());
            params_vec.push(Box::new(title.clone()));
        }
        if let Some(description) = &changes.description {
            assignments.push("description = ?".to_string());
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(status_id) = &changes.status_id {
            assignments.push("status_id = ?".to_string());
            params_vec.push(Box::new(status_id.clone()));
        }
        if let Some(priority_id) = &changes.priority_id {
            assignments.push("priority_id = ?".to_string());
            params_vec.push(Box::new(priority_id.clone()));
        }
        if let Some(assignee_id) = &changes.assignee_id {
            assignments.push("assignee_id = ?".to_string());
            params_vec.push(Box::new(assignee_id.clone()));
        }
        if let Some(project_id) = &changes.project_id {
            assignments.push("project_id = ?".to_string());
            params_vec.push(Box::new(project_id.clone()));
        }
        if let Some(parent_id) = &changes.parent_id {
            assignments.push("parent_id = ?".to_string());
            params_vec.push(Box::new(parent_id.clone()));
        }
        if let Some(rank) = &changes.rank {
            assignments.push("rank = ?".to_string());
            params_vec.push(Box::new(rank.clone()));
        }

        params_vec.push(Box::new(id.to_string()));
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let sql = format!("UPDATE issues SET {} WHERE id = ?", assignments.join(", "));
        let updated = tx.execute(&sql, params_refs.as_slice())?;
        if updated == 0 {
            return Err(CircleError::IssueNotFound(id.to_string()));
        }

        if let Some(label_ids) = &changes.label_ids {
            Self::replace_labels(&tx, id, label_ids)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM issues WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(CircleError::IssueNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count_issues(&self, kind: CountKind) -> Result<BTreeMap<String, u64>> {
        let sql = match kind {
            CountKind::Status => {
                "SELECT status_id, COUNT(*) FROM issues GROUP BY status_id".to_string()
            }
            CountKind::Priority => {
                "SELECT priority_id, COUNT(*) FROM issues GROUP BY priority_id".to_string()
            }
            CountKind::Assignee => format!(
                "SELECT COALESCE(assignee_id, '{UNASSIGNED}'), COUNT(*) FROM issues GROUP BY 1"
            ),
            CountKind::Project => format!(
                "SELECT COALESCE(project_id, '{NO_PROJECT}'), COUNT(*) FROM issues GROUP BY 1"
            ),
            CountKind::Label => {
                "SELECT label_id, COUNT(*) FROM issue_labels GROUP BY label_id".to_string()
            }
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(counts)
    }

    async fn seed(&self, data: &SeedData) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for status in &data.statuses {
            tx.execute(
                "INSERT INTO statuses (id, name, color, icon, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, color = excluded.color,
                    icon = excluded.icon, display_order = excluded.display_order",
                params![
                    status.id,
                    status.name,
                    status.color,
                    status.icon.name(),
                    status.display_order
                ],
            )?;
        }

        for priority in &data.priorities {
            tx.execute(
                "INSERT INTO priorities (id, name, icon, display_order)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, icon = excluded.icon,
                    display_order = excluded.display_order",
                params![
                    priority.id,
                    priority.name,
                    priority.icon.name(),
                    priority.display_order
                ],
            )?;
        }

        for label in &data.labels {
            tx.execute(
                "INSERT INTO labels (id, name, color) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, color = excluded.color",
                params![label.id, label.name, label.color],
            )?;
        }

        for user in &data.users {
            tx.execute(
                "INSERT INTO users (id, name, email, avatar_url, role) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, email = excluded.email,
                    avatar_url = excluded.avatar_url, role = excluded.role",
                params![user.id, user.name, user.email, user.avatar_url, user.role],
            )?;
        }

        for project in &data.projects {
            tx.execute(
                "INSERT INTO projects (id, name, icon, status_id, percent_complete)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, icon = excluded.icon,
                    status_id = excluded.status_id, percent_complete = excluded.percent_complete",
                params![
                    project.id,
                    project.name,
                    project.icon.name(),
                    project.status_id,
                    project.percent_complete
                ],
            )?;
        }

        for team in &data.teams {
            tx.execute(
                "INSERT INTO teams (id, key, name, icon, color) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    key = excluded.key, name = excluded.name,
                    icon = excluded.icon, color = excluded.color",
                params![team.id, team.key, team.name, team.icon, team.color],
            )?;
            for user_id in &team.member_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO team_members (team_id, user_id) VALUES (?1, ?2)",
                    params![team.id, user_id],
                )?;
            }
            for project_id in &team.project_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO team_projects (team_id, project_id) VALUES (?1, ?2)",
                    params![team.id, project_id],
                )?;
            }
        }

        for issue in &data.issues {
            Self::insert_issue_row(&tx, issue)?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank;
    use crate::types::{default_priorities, default_statuses};

    async fn seeded() -> SqliteRepository {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.migrate().unwrap();
        repo.conn()
            .execute_batch(
                "INSERT INTO teams (id, key, name) VALUES ('team-eng', 'ENG', 'Engineering');
                 INSERT INTO users (id, name) VALUES ('user-1', 'Aki');
                 INSERT INTO labels (id, name, color) VALUES ('bug', 'Bug', 'red');",
            )
            .unwrap();
        let data = SeedData {
            statuses: default_statuses(),
            priorities: default_priorities(),
            ..SeedData::default()
        };
        repo.seed(&data).await.unwrap();
        repo
    }

    fn row(id: &str, number: u32, status: &str, rank: &str) -> IssueRow {
        let now = Utc::now();
        IssueRow {
            id: id.to_string(),
            identifier: format!("ENG-{number}"),
            team_id: "team-eng".to_string(),
            title: format!("Issue {number}"),
            description: None,
            status_id: status.to_string(),
            priority_id: "high".to_string(),
            assignee_id: None,
            project_id: None,
            parent_id: None,
            rank: Rank::parse(rank).unwrap(),
            created_at: now,
            updated_at: now,
            label_ids: Vec::new(),
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let repo = SqliteRepository::open_in_memory().unwrap();

        let first = repo.migrate().unwrap();
        let second = repo.migrate().unwrap();

        assert_eq!(first.len(), MIGRATIONS.len());
        assert!(second.is_empty());
        assert!(repo.migration_status().unwrap().iter().all(|m| m.applied));
    }

    #[test]
    fn status_reports_pending_before_migrate() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let status = repo.migration_status().unwrap();
        assert_eq!(status.len(), MIGRATIONS.len());
        assert!(status.iter().all(|m| !m.applied));
    }

    #[test]
    fn open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("circle.sqlite");

        let repo = SqliteRepository::open(&path).unwrap();
        repo.migrate().unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn insert_find_and_labels() {
        let repo = seeded().await;
        let mut issue = row("i1", 1, "not-started", "a3c");
        issue.label_ids = vec!["bug".to_string()];
        repo.insert_issue(&issue).await.unwrap();

        let found = repo.find_issue("eng-1").await.unwrap().unwrap();
        assert_eq!(found.id, "i1");
        assert_eq!(found.label_ids, vec!["bug".to_string()]);
        assert_eq!(found.rank, rank::initial());

        assert!(repo.find_issue("ENG-99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_combine() {
        let repo = seeded().await;
        repo.insert_issue(&row("i1", 1, "not-started", "a3c")).await.unwrap();
        repo.insert_issue(&row("i2", 2, "done", "a3c")).await.unwrap();
        let mut labelled = row("i3", 3, "done", "a3d");
        labelled.label_ids = vec!["bug".to_string()];
        repo.insert_issue(&labelled).await.unwrap();

        let done = repo
            .list_issues(&IssueFilter {
                status_id: Some("done".to_string()),
                ..IssueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(done.len(), 2);

        let bugs = repo
            .list_issues(&IssueFilter {
                status_id: Some("done".to_string()),
                label_id: Some("bug".to_string()),
                ..IssueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].id, "i3");
    }

    #[tokio::test]
    async fn update_changes_fields_and_clears_nullable_ones() {
        let repo = seeded().await;
        let mut issue = row("i1", 1, "not-started", "a3c");
        issue.assignee_id = Some("user-1".to_string());
        repo.insert_issue(&issue).await.unwrap();

        repo.update_issue(
            "i1",
            &IssueChanges {
                title: Some("Renamed".to_string()),
                assignee_id: Some(None),
                label_ids: Some(vec!["bug".to_string()]),
                ..IssueChanges::default()
            },
        )
        .await
        .unwrap();

        let found = repo.find_issue("i1").await.unwrap().unwrap();
        assert_eq!(found.title, "Renamed");
        assert_eq!(found.assignee_id, None);
        assert_eq!(found.label_ids, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_issue_fail() {
        let repo = seeded().await;

        let update = repo.update_issue("nope", &IssueChanges::default()).await;
        assert!(matches!(update, Err(CircleError::IssueNotFound(_))));

        let delete = repo.delete_issue("nope").await;
        assert!(matches!(delete, Err(CircleError::IssueNotFound(_))));
    }

    #[tokio::test]
    async fn deleting_parent_detaches_children() {
        let repo = seeded().await;
        repo.insert_issue(&row("parent", 1, "not-started", "a3c")).await.unwrap();
        let mut child = row("child", 2, "not-started", "a3d");
        child.parent_id = Some("parent".to_string());
        repo.insert_issue(&child).await.unwrap();

        repo.delete_issue("parent").await.unwrap();

        let child = repo.find_issue("child").await.unwrap().unwrap();
        assert_eq!(child.parent_id, None);
    }

    #[tokio::test]
    async fn counts_sum_to_total() {
        let repo = seeded().await;
        let mut assigned = row("i1", 1, "not-started", "a3c");
        assigned.assignee_id = Some("user-1".to_string());
        repo.insert_issue(&assigned).await.unwrap();
        repo.insert_issue(&row("i2", 2, "done", "a3c")).await.unwrap();
        repo.insert_issue(&row("i3", 3, "done", "a3d")).await.unwrap();

        for kind in [
            CountKind::Status,
            CountKind::Priority,
            CountKind::Assignee,
            CountKind::Project,
        ] {
            let counts = repo.count_issues(kind).await.unwrap();
            assert_eq!(counts.values().sum::<u64>(), 3, "{kind} counts");
        }

        let by_assignee = repo.count_issues(CountKind::Assignee).await.unwrap();
        assert_eq!(by_assignee[UNASSIGNED], 2);
        assert_eq!(by_assignee["user-1"], 1);

        let by_project = repo.count_issues(CountKind::Project).await.unwrap();
        assert_eq!(by_project[NO_PROJECT], 3);
    }

    #[tokio::test]
    async fn reseeding_keeps_issue_references() {
        let repo = seeded().await;
        let mut issue = row("i1", 1, "not-started", "a3c");
        issue.assignee_id = Some("user-1".to_string());
        repo.insert_issue(&issue).await.unwrap();

        let data = SeedData {
            statuses: default_statuses(),
            priorities: default_priorities(),
            users: vec![User {
                id: "user-1".to_string(),
                name: "Aki Renamed".to_string(),
                email: None,
                avatar_url: None,
                role: None,
                team_ids: Vec::new(),
            }],
            ..SeedData::default()
        };
        repo.seed(&data).await.unwrap();

        let found = repo.find_issue("i1").await.unwrap().unwrap();
        assert_eq!(found.assignee_id.as_deref(), Some("user-1"));
        let users = repo.list_users().await.unwrap();
        assert_eq!(users[0].name, "Aki Renamed");
    }

    #[tokio::test]
    async fn malformed_rank_in_storage_is_an_error() {
        let repo = seeded().await;
        repo.conn()
            .execute(
                "INSERT INTO issues (id, identifier, team_id, title, status_id, priority_id, rank, created_at, updated_at)
                 VALUES ('bad', 'ENG-9', 'team-eng', 'Bad', 'done', 'low', 'BAD RANK', ?1, ?1)",
                [Utc::now().to_rfc3339()],
            )
            .unwrap();

        let result = repo.find_issue("bad").await;
        assert!(result.is_err());
    }
}
