//! Achievement badges unlocked by completing specific chapters

use serde::Serialize;
use std::collections::BTreeSet;

use crate::content::ChapterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeId {
    AvidReader,
    BrightIdea,
    MasterOfWisdom,
}

impl BadgeId {
    pub const ALL: [BadgeId; 3] = [BadgeId::AvidReader, BadgeId::BrightIdea, BadgeId::MasterOfWisdom];

    pub fn label(self) -> &'static str {
        match self {
            BadgeId::AvidReader => "Avid Reader",
            BadgeId::BrightIdea => "Bright Idea",
            BadgeId::MasterOfWisdom => "Master of Wisdom",
        }
    }

    /// Completing this chapter unlocks the badge
    pub fn unlocking_chapter(self) -> ChapterId {
        match self {
            BadgeId::AvidReader => 3,
            BadgeId::BrightIdea => 5,
            BadgeId::MasterOfWisdom => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub badge: BadgeId,
    pub label: &'static str,
    pub unlocked: bool,
}

/// Every badge with its unlock state, in display order
pub fn earned_badges(completed: &BTreeSet<ChapterId>) -> Vec<BadgeStatus> {
    BadgeId::ALL
        .iter()
        .map(|badge| BadgeStatus {
            badge: *badge,
            label: badge.label(),
            unlocked: completed.contains(&badge.unlocking_chapter()),
        })
        .collect()
}
