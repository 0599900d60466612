//! Per-user records and back-office entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Tier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    /// Due time; cleared when the reminder is dismissed
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
}

impl Task {
    /// Incomplete with a reminder at or before `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.reminder.is_some_and(|r| r <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub id: Uuid,
    pub description: String,
    pub target: u32,
    /// Always within `0..=target`
    pub current: u32,
}

impl WeeklyGoal {
    pub fn is_met(&self) -> bool {
        self.current >= self.target
    }
}

/// Back-office role; users without a role are students
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Professor,
    #[serde(alias = "Administrador")]
    Administrator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Professor => "Professor",
            Role::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Professor" => Ok(Role::Professor),
            "Administrator" | "Administrador" => Ok(Role::Administrator),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Account record shared by students and staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub joined_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_staff(&self) -> bool {
        self.role.is_some()
    }

    /// Either staff role may open the back office
    pub fn can_access_backoffice(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Administrator)
    }
}

/// Default avatar for accounts created without one
pub fn default_avatar_url(seed: &str) -> String {
    format!("https://i.pravatar.cc/100?u={}", seed)
}

/// Student row in the back office
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Completed chapters as a percentage of the catalog
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayType {
    Banner,
    Notification,
    Both,
}

impl DisplayType {
    pub fn shows_banner(self) -> bool {
        matches!(self, DisplayType::Banner | DisplayType::Both)
    }

    pub fn pushes_notification(self) -> bool {
        matches!(self, DisplayType::Notification | DisplayType::Both)
    }
}

/// Message published by staff to every user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub message: String,
    pub display_type: DisplayType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalNotification {
    pub id: Uuid,
    pub message: String,
}
