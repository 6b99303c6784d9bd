use std::fmt;

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::Icon;

/// Priority levels for issues, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Priority {
    /// Urgent priority
    Urgent,
    /// High priority
    High,
    /// Medium priority (also accepted as "normal")
    #[value(alias = "normal")]
    Medium,
    /// Low priority
    Low,
    /// No priority
    #[value(name = "none", alias = "no-priority")]
    NoPriority,
}

/// Sort position given to priority ids that are not in the lookup table.
pub const UNKNOWN_PRIORITY_ORDER: u8 = 5;

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::NoPriority,
    ];

    /// Look up a stored priority id.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "urgent" => Some(Priority::Urgent),
            "high" => Some(Priority::High),
            "medium" | "normal" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            "no-priority" | "none" => Some(Priority::NoPriority),
            _ => None,
        }
    }

    /// The id this priority is stored under.
    pub fn slug(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::NoPriority => "no-priority",
        }
    }

    pub fn sort_order(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::NoPriority => 4,
        }
    }

    /// Get the label for this priority.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Urgent => "Urgent",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::NoPriority => "None",
        }
    }

    pub fn icon(self) -> Icon {
        match self {
            Priority::Urgent => Icon::AlertTriangle,
            Priority::High => Icon::ArrowUp,
            Priority::Medium => Icon::Minus,
            Priority::Low => Icon::ArrowDown,
            Priority::NoPriority => Icon::Circle,
        }
    }

    /// Get the colored label for terminal output.
    pub fn colored(self) -> String {
        let label = self.label();
        match self {
            Priority::NoPriority => label.to_string(),
            Priority::Urgent => label.red().bold().to_string(),
            Priority::High => label.yellow().bold().to_string(),
            Priority::Medium => label.blue().to_string(),
            Priority::Low => label.bright_black().to_string(),
        }
    }

    /// Default record for this level, used when seeding storage.
    pub fn info(self) -> PriorityInfo {
        PriorityInfo {
            id: self.slug().to_string(),
            name: self.label().to_string(),
            icon: self.icon(),
            display_order: i64::from(self.sort_order()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A priority row as stored. The id is a free-form string, so it may name a
/// level this build does not know.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PriorityInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Icon,
    #[serde(default)]
    pub display_order: i64,
}

impl PriorityInfo {
    pub fn level(&self) -> Option<Priority> {
        Priority::from_slug(&self.id)
    }

    /// Placeholder used when an issue references a priority id that has no row.
    pub fn unresolved(id: &str) -> Self {
        match Priority::from_slug(id) {
            Some(level) => level.info(),
            None => Self {
                id: id.to_string(),
                name: id.to_string(),
                icon: Icon::default(),
                display_order: i64::from(UNKNOWN_PRIORITY_ORDER),
            },
        }
    }
}

pub fn default_priorities() -> Vec<PriorityInfo> {
    Priority::ALL.iter().map(|p| p.info()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip() {
        for priority in Priority::ALL {
            assert_eq!(Priority::from_slug(priority.slug()), Some(priority));
        }
    }

    #[test]
    fn normal_is_medium() {
        assert_eq!(Priority::from_slug("normal"), Some(Priority::Medium));
        assert_eq!(Priority::from_slug("none"), Some(Priority::NoPriority));
        assert_eq!(Priority::from_slug("mystery"), None);
    }

    #[test]
    fn sort_order_matches_variant_order() {
        let mut sorted = Priority::ALL.to_vec();
        sorted.sort_by_key(|p| p.sort_order());
        assert_eq!(sorted, Priority::ALL.to_vec());
        assert!(Priority::ALL
            .iter()
            .all(|p| p.sort_order() < UNKNOWN_PRIORITY_ORDER));
    }

    #[test]
    fn unresolved_keeps_unknown_id() {
        let info = PriorityInfo::unresolved("mystery");
        assert_eq!(info.id, "mystery");
        assert_eq!(info.level(), None);

        let known = PriorityInfo::unresolved("normal");
        assert_eq!(known.level(), Some(Priority::Medium));
    }
}
