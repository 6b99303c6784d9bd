use serde::{Deserialize, Serialize};

/// A team. `key` prefixes the identifiers of its issues (e.g. `ENG-12`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub key: String,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
}
