use serde::{Deserialize, Serialize};

use super::Icon;

/// A workflow stage. Statuses are seeded once and ordered by `display_order`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Status {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Icon,
    #[serde(default)]
    pub display_order: i64,
}

pub const DEFAULT_STATUS_COLOR: &str = "#888888";

impl Status {
    fn seeded(id: &str, name: &str, color: &str, icon: Icon, display_order: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            icon,
            display_order,
        }
    }

    /// Placeholder for an issue whose status id has no row.
    pub fn unresolved(id: &str) -> Self {
        default_statuses()
            .into_iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| Self::seeded(id, id, DEFAULT_STATUS_COLOR, Icon::default(), i64::MAX))
    }
}

pub fn default_statuses() -> Vec<Status> {
    vec![
        Status::seeded("not-started", "Not Started", "#CBD5E1", Icon::Circle, 0),
        Status::seeded("in-progress", "In Progress", "#FBCFE8", Icon::Spinner, 1),
        Status::seeded("done", "Done", "#A7F3D0", Icon::CheckCircle, 2),
        Status::seeded("cancelled", "Cancelled", "#FEE2E2", Icon::XCircle, 3),
    ]
}
