//! Icon identifiers for chapters and content sections
//!
//! Icons are referenced by a stable name. Stored configuration carries the name
//! only; unknown names fall back to [`IconName::BookOpen`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum IconName {
    #[default]
    BookOpen,
    BadgeCheck,
    CalendarDays,
    CheckSquare,
    ClipboardList,
    Compass,
    Flame,
    FlaskConical,
    GitBranch,
    Infinity,
    Layers,
    Lightbulb,
    PieChart,
    PlayCircle,
    RefreshCw,
    Rocket,
    Sparkles,
    Stairs,
    Target,
    Trophy,
    Waves,
    Wrench,
}

impl IconName {
    pub const ALL: [IconName; 22] = [
        IconName::BookOpen,
        IconName::BadgeCheck,
        IconName::CalendarDays,
        IconName::CheckSquare,
        IconName::ClipboardList,
        IconName::Compass,
        IconName::Flame,
        IconName::FlaskConical,
        IconName::GitBranch,
        IconName::Infinity,
        IconName::Layers,
        IconName::Lightbulb,
        IconName::PieChart,
        IconName::PlayCircle,
        IconName::RefreshCw,
        IconName::Rocket,
        IconName::Sparkles,
        IconName::Stairs,
        IconName::Target,
        IconName::Trophy,
        IconName::Waves,
        IconName::Wrench,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IconName::BookOpen => "BookOpen",
            IconName::BadgeCheck => "BadgeCheck",
            IconName::CalendarDays => "CalendarDays",
            IconName::CheckSquare => "CheckSquare",
            IconName::ClipboardList => "ClipboardList",
            IconName::Compass => "Compass",
            IconName::Flame => "Flame",
            IconName::FlaskConical => "FlaskConical",
            IconName::GitBranch => "GitBranch",
            IconName::Infinity => "Infinity",
            IconName::Layers => "Layers",
            IconName::Lightbulb => "Lightbulb",
            IconName::PieChart => "PieChart",
            IconName::PlayCircle => "PlayCircle",
            IconName::RefreshCw => "RefreshCw",
            IconName::Rocket => "Rocket",
            IconName::Sparkles => "Sparkles",
            IconName::Stairs => "Stairs",
            IconName::Target => "Target",
            IconName::Trophy => "Trophy",
            IconName::Waves => "Waves",
            IconName::Wrench => "Wrench",
        }
    }

    /// Look up an icon by name; `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        // Older configs stored the component name of the infinity icon
        if name == "InfinityIcon" {
            return Some(IconName::Infinity);
        }
        Self::ALL.iter().copied().find(|icon| icon.as_str() == name)
    }
}

impl From<String> for IconName {
    fn from(name: String) -> Self {
        IconName::from_name(&name).unwrap_or_default()
    }
}

impl fmt::Display for IconName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_icon_round_trips_by_name() {
        for icon in IconName::ALL {
            assert_eq!(IconName::from_name(icon.as_str()), Some(icon));
        }
    }

    #[test]
    fn test_unknown_name_falls_back_to_book_open() {
        let icon: IconName = serde_json::from_str("\"Hourglass\"").unwrap();
        assert_eq!(icon, IconName::BookOpen);
    }

    #[test]
    fn test_legacy_infinity_component_name() {
        let icon: IconName = serde_json::from_str("\"InfinityIcon\"").unwrap();
        assert_eq!(icon, IconName::Infinity);
        assert_eq!(serde_json::to_string(&icon).unwrap(), "\"Infinity\"");
    }
}
