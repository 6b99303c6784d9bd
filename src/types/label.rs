use serde::{Deserialize, Serialize};

pub const DEFAULT_LABEL_COLOR: &str = "#4f46e5";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
}
