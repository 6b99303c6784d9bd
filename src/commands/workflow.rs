//! Status and priority listings.

use tabled::Tabled;

use circle::error::Result;
use circle::tracker::Tracker;
use circle::types::{PriorityInfo, Status};

use crate::output::{self, priority_colored, status_colored};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Order")]
    order: i64,
    #[tabled(rename = "Status")]
    name: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Icon")]
    icon: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Status> for StatusRow {
    fn from(status: &Status) -> Self {
        Self {
            order: status.display_order,
            name: status_colored(status),
            color: status.color.clone(),
            icon: status.icon.name().to_string(),
            id: status.id.clone(),
        }
    }
}

#[derive(Tabled)]
struct PriorityRow {
    #[tabled(rename = "Order")]
    order: i64,
    #[tabled(rename = "Priority")]
    name: String,
    #[tabled(rename = "Icon")]
    icon: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&PriorityInfo> for PriorityRow {
    fn from(priority: &PriorityInfo) -> Self {
        Self {
            order: priority.display_order,
            name: priority_colored(priority),
            icon: priority.icon.name().to_string(),
            id: priority.id.clone(),
        }
    }
}

pub async fn statuses(tracker: &Tracker) -> Result<()> {
    let statuses = tracker.statuses().await?;
    output::print_table(
        &statuses,
        |s| StatusRow::from(s),
        |s| format!("{} {}", s.id, s.name),
    );
    Ok(())
}

pub async fn priorities(tracker: &Tracker) -> Result<()> {
    let priorities = tracker.priorities().await?;
    output::print_table(
        &priorities,
        |p| PriorityRow::from(p),
        |p| format!("{} {}", p.id, p.name),
    );
    Ok(())
}
