//! Subscription tiers and the access gate
//!
//! Tiers form a total order: Free < Essential < Complete. A user holding tier
//! `t` may open anything whose required tier is at or below `t`. The same gate
//! is applied to chapters, dashboard widgets and search results (locked search
//! results are still listed, only flagged).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Subscription level attached to users, chapters and widgets
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    /// Entry level, no subscription
    #[default]
    #[serde(alias = "Grátis", alias = "free")]
    Free,
    #[serde(alias = "Essencial", alias = "essential")]
    Essential,
    #[serde(alias = "Completo", alias = "complete")]
    Complete,
}

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Essential, Tier::Complete];

    /// Position in the total order (Free=0, Essential=1, Complete=2)
    pub fn rank(self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Essential => 1,
            Tier::Complete => 2,
        }
    }

    /// Whether a holder of `self` may access something requiring `required`
    pub fn satisfies(self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Essential => "Essential",
            Tier::Complete => "Complete",
        }
    }
}

/// Tier gate: `rank(user_tier) >= rank(required_tier)`
pub fn has_access(user_tier: Tier, required_tier: Tier) -> bool {
    user_tier.satisfies(required_tier)
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Free" | "free" | "Grátis" => Ok(Tier::Free),
            "Essential" | "essential" | "Essencial" => Ok(Tier::Essential),
            "Complete" | "complete" | "Completo" => Ok(Tier::Complete),
            other => Err(Error::InvalidInput(format!("Unknown tier: {}", other))),
        }
    }
}
