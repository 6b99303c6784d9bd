use serde::{Deserialize, Serialize};

use super::Icon;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Icon,
    pub status_id: Option<String>,
    #[serde(default)]
    pub percent_complete: f64,
}
