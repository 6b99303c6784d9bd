use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Icons referenced by statuses, priorities, projects and teams.
///
/// Storage keeps icons as kebab-case names; anything unrecognised falls back
/// to [`Icon::CircleDot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Icon {
    #[default]
    CircleDot,
    Circle,
    Spinner,
    CheckCircle,
    XCircle,
    AlertTriangle,
    ArrowUp,
    Minus,
    ArrowDown,
    Folder,
    Users,
}

impl Icon {
    pub const ALL: [Icon; 11] = [
        Icon::CircleDot,
        Icon::Circle,
        Icon::Spinner,
        Icon::CheckCircle,
        Icon::XCircle,
        Icon::AlertTriangle,
        Icon::ArrowUp,
        Icon::Minus,
        Icon::ArrowDown,
        Icon::Folder,
        Icon::Users,
    ];

    /// Resolve a stored icon name, warning and using the default for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        if normalized.is_empty() || normalized == "undefined" {
            return Icon::default();
        }

        match Self::ALL.iter().find(|icon| icon.name() == normalized) {
            Some(icon) => *icon,
            None => {
                tracing::warn!(icon = name, "unknown icon, using default");
                Icon::default()
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Icon::CircleDot => "circle-dot",
            Icon::Circle => "circle",
            Icon::Spinner => "spinner",
            Icon::CheckCircle => "check-circle",
            Icon::XCircle => "x-circle",
            Icon::AlertTriangle => "alert-triangle",
            Icon::ArrowUp => "arrow-up",
            Icon::Minus => "minus",
            Icon::ArrowDown => "arrow-down",
            Icon::Folder => "folder",
            Icon::Users => "users",
        }
    }

    /// Terminal glyph used when rendering this icon.
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::CircleDot => "◉",
            Icon::Circle => "○",
            Icon::Spinner => "◐",
            Icon::CheckCircle => "✔",
            Icon::XCircle => "✖",
            Icon::AlertTriangle => "⚠",
            Icon::ArrowUp => "↑",
            Icon::Minus => "–",
            Icon::ArrowDown => "↓",
            Icon::Folder => "▤",
            Icon::Users => "☷",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Icon {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Icon {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.as_deref().map(Icon::from_name).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for icon in Icon::ALL {
            assert_eq!(Icon::from_name(icon.name()), icon);
        }
    }

    #[test]
    fn unknown_and_empty_names_use_default() {
        assert_eq!(Icon::from_name("sparkles"), Icon::CircleDot);
        assert_eq!(Icon::from_name(""), Icon::CircleDot);
        assert_eq!(Icon::from_name("undefined"), Icon::CircleDot);
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(Icon::from_name("Check_Circle"), Icon::CheckCircle);
        assert_eq!(Icon::from_name(" arrow-up "), Icon::ArrowUp);
    }

    #[test]
    fn null_icon_deserializes_to_default() {
        let icon: Icon = serde_json::from_str("null").unwrap();
        assert_eq!(icon, Icon::CircleDot);
    }
}
