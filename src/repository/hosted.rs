//! Hosted adapter: a Supabase project reached through its PostgREST API.
//!
//! Tables mirror the local schema and live in a dedicated Postgres schema
//! (`circle` unless configured), selected with the `Accept-Profile` and
//! `Content-Profile` headers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use super::{
    CountKind, IssueChanges, IssueFilter, IssueRepository, IssueRow, SeedData, NO_PROJECT,
    UNASSIGNED,
};
use crate::config::{Backend, HostedCredentials};
use crate::error::{CircleError, Result};
use crate::issues::tally;
use crate::types::{
    Icon, Label, PriorityInfo, Project, Status, Team, User, DEFAULT_LABEL_COLOR,
    DEFAULT_STATUS_COLOR,
};

const REST_PATH: &str = "rest/v1/";

/// Rows requested per GET. Supabase caps responses at `max_rows` (1000 by
/// default) and drops the rest silently, so listings are read in pages.
const PAGE_SIZE: usize = 1000;

pub struct HostedRepository {
    http: Client,
    base: Url,
    api_key: String,
    schema: String,
}

#[derive(Deserialize)]
struct StatusRecord {
    id: String,
    name: String,
    color: Option<String>,
    icon: Option<String>,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct LabelRecord {
    id: String,
    name: String,
    color: Option<String>,
}

#[derive(Deserialize)]
struct TeamRef {
    team_id: String,
}

#[derive(Deserialize)]
struct UserRef {
    user_id: String,
}

#[derive(Deserialize)]
struct ProjectRef {
    project_id: String,
}

#[derive(Deserialize)]
struct LabelRef {
    label_id: String,
}

#[derive(Deserialize)]
struct UserRecord {
    id: String,
    name: String,
    email: Option<String>,
    avatar_url: Option<String>,
    role: Option<String>,
    #[serde(default)]
    team_members: Vec<TeamRef>,
}

#[derive(Deserialize)]
struct TeamRecord {
    id: String,
    key: String,
    name: String,
    icon: Option<String>,
    color: Option<String>,
    #[serde(default)]
    team_members: Vec<UserRef>,
    #[serde(default)]
    team_projects: Vec<ProjectRef>,
}

/// An issue row with its label links embedded.
#[derive(Deserialize)]
struct IssueRecord {
    #[serde(flatten)]
    row: IssueRow,
    #[serde(default)]
    issue_labels: Vec<LabelRef>,
}

#[derive(Deserialize)]
struct CountRecord {
    status_id: String,
    priority_id: String,
    assignee_id: Option<String>,
    project_id: Option<String>,
}

#[derive(Serialize)]
struct IssueLabelLink<'a> {
    issue_id: &'a str,
    label_id: &'a str,
}

impl From<StatusRecord> for Status {
    fn from(record: StatusRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            color: record
                .color
                .unwrap_or_else(|| DEFAULT_STATUS_COLOR.to_string()),
            icon: record.icon.as_deref().map(Icon::from_name).unwrap_or_default(),
            display_order: record.display_order,
        }
    }
}

impl From<LabelRecord> for Label {
    fn from(record: LabelRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            color: record
                .color
                .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            avatar_url: record.avatar_url,
            role: record.role,
            team_ids: record.team_members.into_iter().map(|m| m.team_id).collect(),
        }
    }
}

impl From<TeamRecord> for Team {
    fn from(record: TeamRecord) -> Self {
        Self {
            id: record.id,
            key: record.key,
            name: record.name,
            icon: record.icon,
            color: record.color,
            member_ids: record.team_members.into_iter().map(|m| m.user_id).collect(),
            project_ids: record
                .team_projects
                .into_iter()
                .map(|p| p.project_id)
                .collect(),
        }
    }
}

impl From<IssueRecord> for IssueRow {
    fn from(record: IssueRecord) -> Self {
        let mut row = record.row;
        row.label_ids = record.issue_labels.into_iter().map(|l| l.label_id).collect();
        row.label_ids.sort();
        row
    }
}

/// PostgREST query pairs for an issue listing. Label membership is checked
/// after the fetch so the embedded label list stays complete.
fn issue_query(filter: &IssueFilter) -> Vec<(String, String)> {
    let mut query = vec![
        ("select".to_string(), "*,issue_labels(label_id)".to_string()),
        ("order".to_string(), "created_at.desc,id.desc".to_string()),
    ];

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
            query.push((column.to_string(), format!("eq.{value}")));
        }
    }

    query
}

/// Lookup for one issue. Identifiers are stored uppercase and matched with
/// `eq`, so wildcard characters in `key` are taken literally.
fn find_query(column: &str, key: &str) -> Vec<(String, String)> {
    let value = if column == "identifier" {
        key.to_ascii_uppercase()
    } else {
        key.to_string()
    };
    vec![
        ("select".to_string(), "*,issue_labels(label_id)".to_string()),
        (column.to_string(), format!("eq.{value}")),
        ("limit".to_string(), "1".to_string()),
    ]
}

/// `query` restricted to the page starting at `offset`.
fn page_query(query: &[(String, String)], offset: usize) -> Vec<(String, String)> {
    let mut paged: Vec<(String, String)> = query
        .iter()
        .filter(|(key, _)| key != "limit" && key != "offset")
        .cloned()
        .collect();
    paged.push(("limit".to_string(), PAGE_SIZE.to_string()));
    paged.push(("offset".to_string(), offset.to_string()));
    paged
}

/// A write asked for `return=representation` must echo at least one row.
fn ensure_written(rows: &[Value]) -> Result<()> {
    if rows.is_empty() {
        return Err(CircleError::EmptyResponse);
    }
    Ok(())
}

/// JSON patch body for an update. Cleared nullable fields become `null`.
fn changes_body(changes: &IssueChanges, now: DateTime<Utc>) -> Value {
    let mut body = Map::new();
    body.insert("updated_at".to_string(), json!(now.to_rfc3339()));

    if let Some(title) = &changes.title {
        body.insert("title".to_string(), json!(title));
    }
    if let Some(description) = &changes.description {
        body.insert("description".to_string(), json!(description));
    }
    if let Some(status_id) = &changes.status_id {
        body.insert("status_id".to_string(), json!(status_id));
    }
    if let Some(priority_id) = &changes.priority_id {
        body.insert("priority_id".to_string(), json!(priority_id));
    }
    if let Some(assignee_id) = &changes.assignee_id {
        body.insert("assignee_id".to_string(), json!(assignee_id));
    }
    if let Some(project_id) = &changes.project_id {
        body.insert("project_id".to_string(), json!(project_id));
    }
    if let Some(parent_id) = &changes.parent_id {
        body.insert("parent_id".to_string(), json!(parent_id));
    }
    if let Some(rank) = &changes.rank {
        body.insert("rank".to_string(), json!(rank));
    }

    Value::Object(body)
}

fn count_key(record: &CountRecord, kind: CountKind) -> String {
    match kind {
        CountKind::Status => record.status_id.clone(),
        CountKind::Priority => record.priority_id.clone(),
        CountKind::Assignee => record
            .assignee_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED.to_string()),
        CountKind::Project => record
            .project_id
            .clone()
            .unwrap_or_else(|| NO_PROJECT.to_string()),
        CountKind::Label => String::new(),
    }
}

impl HostedRepository {
    pub fn new(credentials: HostedCredentials) -> Self {
        Self {
            http: Client::new(),
            base: credentials.url,
            api_key: credentials.api_key,
            schema: credentials.schema,
        }
    }

    fn endpoint(&self, table: &str) -> Result<Url> {
        self.base
            .join(REST_PATH)
            .and_then(|rest| rest.join(table))
            .map_err(|_| CircleError::InvalidUrl(format!("{}{REST_PATH}{table}", self.base)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            return Err(CircleError::ApiError {
                status: response.status().as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string()),
            });
        }

        Ok(response)
    }

    /// One GET, returning whatever the server sends back.
    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let url = self.endpoint(table)?;
        tracing::debug!(%url, ?query, "hosted select");
        let response = self.send(self.http.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    /// Every row matching `query`, read page by page until a short page.
    /// `query` must carry an `order` so pages do not overlap.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        loop {
            let page: Vec<T> = self.fetch(table, &page_query(query, rows.len())).await?;
            let done = page.len() < PAGE_SIZE;
            rows.extend(page);
            if done {
                return Ok(rows);
            }
        }
    }

    async fn upsert<T: Serialize + ?Sized>(&self, table: &str, body: &T) -> Result<()> {
        let url = self.endpoint(table)?;
        self.send(
            self.http
                .post(url)
                .header("Prefer", "return=minimal,resolution=merge-duplicates")
                .json(body),
        )
        .await?;
        Ok(())
    }

    async fn replace_labels(&self, issue_id: &str, label_ids: &[String]) -> Result<()> {
        let url = self.endpoint("issue_labels")?;
        self.send(
            self.http
                .delete(url)
                .query(&[("issue_id", format!("eq.{issue_id}"))]),
        )
        .await?;

        if label_ids.is_empty() {
            return Ok(());
        }

        let links: Vec<IssueLabelLink<'_>> = label_ids
            .iter()
            .map(|label_id| IssueLabelLink { issue_id, label_id })
            .collect();
        self.upsert("issue_labels", &links).await
    }

    fn by_name(field: &str) -> Vec<(String, String)> {
        vec![
            ("select".to_string(), field.to_string()),
            ("order".to_string(), "name.asc,id.asc".to_string()),
        ]
    }
}

#[async_trait]
impl IssueRepository for HostedRepository {
    fn backend(&self) -> Backend {
        Backend::Hosted
    }

    async fn list_statuses(&self) -> Result<Vec<Status>> {
        let query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "display_order.asc,id.asc".to_string()),
        ];
        let records: Vec<StatusRecord> = self.select("statuses", &query).await?;
        Ok(records.into_iter().map(Status::from).collect())
    }

    async fn list_priorities(&self) -> Result<Vec<PriorityInfo>> {
        let query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "display_order.asc,id.asc".to_string()),
        ];
        self.select("priorities", &query).await
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let records: Vec<LabelRecord> = self.select("labels", &Self::by_name("*")).await?;
        Ok(records.into_iter().map(Label::from).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let records: Vec<UserRecord> = self
            .select("users", &Self::by_name("*,team_members(team_id)"))
            .await?;
        Ok(records.into_iter().map(User::from).collect())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let records: Vec<TeamRecord> = self
            .select(
                "teams",
                &Self::by_name("*,team_members(user_id),team_projects(project_id)"),
            )
            .await?;
        Ok(records.into_iter().map(Team::from).collect())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.select("projects", &Self::by_name("*")).await
    }

    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRow>> {
        let records: Vec<IssueRecord> = self.select("issues", &issue_query(filter)).await?;
        let rows = records.into_iter().map(IssueRow::from);

        Ok(match &filter.label_id {
            Some(label_id) => rows.filter(|row| row.label_ids.contains(label_id)).collect(),
            None => rows.collect(),
        })
    }

    async fn find_issue(&self, key: &str) -> Result<Option<IssueRow>> {
        for column in ["identifier", "id"] {
            let records: Vec<IssueRecord> =
                self.fetch("issues", &find_query(column, key)).await?;
            if let Some(record) = records.into_iter().next() {
                return Ok(Some(record.into()));
            }
        }
        Ok(None)
    }

    async fn insert_issue(&self, row: &IssueRow) -> Result<()> {
        let url = self.endpoint("issues")?;
        let response = self
            .send(
                self.http
                    .post(url)
                    .query(&[("select", "id")])
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .await?;
        let inserted: Vec<Value> = response.json().await?;
        ensure_written(&inserted)?;

        if !row.label_ids.is_empty() {
            self.replace_labels(&row.id, &row.label_ids).await?;
        }
        Ok(())
    }

    async fn update_issue(&self, id: &str, changes: &IssueChanges) -> Result<()> {
        let url = self.endpoint("issues")?;
        let response = self
            .send(
                self.http
                    .patch(url)
                    .query(&[("id", format!("eq.{id}")), ("select", "id".to_string())])
                    .header("Prefer", "return=representation")
                    .json(&changes_body(changes, Utc::now())),
            )
            .await?;

        let updated: Vec<Value> = response.json().await?;
        if updated.is_empty() {
            return Err(CircleError::IssueNotFound(id.to_string()));
        }

        if let Some(label_ids) = &changes.label_ids {
            self.replace_labels(id, label_ids).await?;
        }
        Ok(())
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        let url = self.endpoint("issues")?;
        let response = self
            .send(
                self.http
                    .delete(url)
                    .query(&[("id", format!("eq.{id}")), ("select", "id".to_string())])
                    .header("Prefer", "return=representation"),
            )
            .await?;

        let deleted: Vec<Value> = response.json().await?;
        if deleted.is_empty() {
            return Err(CircleError::IssueNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count_issues(&self, kind: CountKind) -> Result<BTreeMap<String, u64>> {
        if kind == CountKind::Label {
            let query = vec![
                ("select".to_string(), "label_id".to_string()),
                ("order".to_string(), "issue_id.asc,label_id.asc".to_string()),
            ];
            let links: Vec<LabelRef> = self.select("issue_labels", &query).await?;
            return Ok(tally(links.into_iter().map(|l| l.label_id)));
        }

        let query = vec![
            (
                "select".to_string(),
                "status_id,priority_id,assignee_id,project_id".to_string(),
            ),
            ("order".to_string(), "id.asc".to_string()),
        ];
        let records: Vec<CountRecord> = self.select("issues", &query).await?;
        Ok(tally(records.iter().map(|r| count_key(r, kind))))
    }

    async fn seed(&self, data: &SeedData) -> Result<()> {
        if !data.statuses.is_empty() {
            self.upsert("statuses", &data.statuses).await?;
        }
        if !data.priorities.is_empty() {
            self.upsert("priorities", &data.priorities).await?;
        }
        if !data.labels.is_empty() {
            self.upsert("labels", &data.labels).await?;
        }
        if !data.users.is_empty() {
            let users: Vec<Value> = data
                .users
                .iter()
                .map(|u| {
                    json!({
                        "id": u.id, "name": u.name, "email": u.email,
                        "avatar_url": u.avatar_url, "role": u.role,
                    })
                })
                .collect();
            self.upsert("users", &users).await?;
        }
        if !data.projects.is_empty() {
            self.upsert("projects", &data.projects).await?;
        }

        for team in &data.teams {
            let record = json!({
                "id": team.id, "key": team.key, "name": team.name,
                "icon": team.icon, "color": team.color,
            });
            self.upsert("teams", &[record]).await?;

            let members: Vec<Value> = team
                .member_ids
                .iter()
                .map(|user_id| json!({ "team_id": team.id, "user_id": user_id }))
                .collect();
            if !members.is_empty() {
                self.upsert("team_members", &members).await?;
            }

            let projects: Vec<Value> = team
                .project_ids
                .iter()
                .map(|project_id| json!({ "team_id": team.id, "project_id": project_id }))
                .collect();
            if !projects.is_empty() {
                self.upsert("team_projects", &projects).await?;
            }
        }

        if !data.issues.is_empty() {
            self.upsert("issues", &data.issues).await?;
            for issue in data.issues.iter().filter(|i| !i.label_ids.is_empty()) {
                self.replace_labels(&issue.id, &issue.label_ids).await?;
            }
        }

        Ok(())
    }
}
