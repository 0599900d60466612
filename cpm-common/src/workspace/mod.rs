//! Per-user workspace: notes, tasks, weekly goals, favorites and form answers
//!
//! All mutations are applied in memory and report the [`RecordKey`] they
//! touched so the caller can persist exactly that record. Input that fails
//! validation on an add (blank text, non-positive goal target) is a silent
//! no-op and reports nothing.

pub mod models;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

use crate::content::{
    compute_completed_chapters, progress_percentage, ChapterId, CompletionRequirements,
    CourseCatalog, FormAnswers, FormValue,
};
use crate::{Error, Result, Tier};

pub use models::{
    default_avatar_url, Announcement, DisplayType, GlobalNotification, Note, Role,
    StudentSummary, Task, UserProfile, WeeklyGoal,
};

/// Identifies one stored record of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Profile,
    Note(Uuid),
    Task(Uuid),
    Goal(Uuid),
    Favorite(ChapterId),
    Answer(String),
}

/// In-memory state owned by one signed-in user
#[derive(Debug, Clone)]
pub struct UserWorkspace {
    profile: UserProfile,
    notes: Vec<Note>,
    tasks: Vec<Task>,
    goals: Vec<WeeklyGoal>,
    favorites: BTreeSet<ChapterId>,
    answers: FormAnswers,
}

impl UserWorkspace {
    /// Empty workspace for a new account
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            notes: Vec::new(),
            tasks: Vec::new(),
            goals: Vec::new(),
            favorites: BTreeSet::new(),
            answers: FormAnswers::new(),
        }
    }

    /// Workspace restored from storage; lists are expected newest first
    pub fn from_parts(
        profile: UserProfile,
        notes: Vec<Note>,
        tasks: Vec<Task>,
        goals: Vec<WeeklyGoal>,
        favorites: BTreeSet<ChapterId>,
        answers: FormAnswers,
    ) -> Self {
        Self {
            profile,
            notes,
            tasks,
            goals,
            favorites,
            answers,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn user_id(&self) -> &str {
        &self.profile.id
    }

    pub fn tier(&self) -> Tier {
        self.profile.tier
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn goals(&self) -> &[WeeklyGoal] {
        &self.goals
    }

    pub fn favorites(&self) -> &BTreeSet<ChapterId> {
        &self.favorites
    }

    pub fn answers(&self) -> &FormAnswers {
        &self.answers
    }

    pub fn note(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn goal(&self, id: Uuid) -> Option<&WeeklyGoal> {
        self.goals.iter().find(|g| g.id == id)
    }

    // ---- profile ----

    pub fn set_tier(&mut self, tier: Tier) -> RecordKey {
        self.profile.tier = tier;
        RecordKey::Profile
    }

    pub fn update_profile(&mut self, name: &str, avatar_url: Option<&str>) -> Result<RecordKey> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Name must not be empty".to_string()));
        }
        self.profile.name = name.to_string();
        if let Some(url) = avatar_url {
            self.profile.avatar_url = url.to_string();
        }
        Ok(RecordKey::Profile)
    }

    // ---- notes ----

    pub fn add_note(&mut self, content: &str) -> Option<RecordKey> {
        if content.trim().is_empty() {
            return None;
        }
        let id = Uuid::new_v4();
        self.notes.insert(
            0,
            Note {
                id,
                content: content.to_string(),
            },
        );
        Some(RecordKey::Note(id))
    }

    pub fn edit_note(&mut self, id: Uuid, content: &str) -> Result<RecordKey> {
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("Note {}", id)))?;
        note.content = content.to_string();
        Ok(RecordKey::Note(id))
    }

    pub fn delete_note(&mut self, id: Uuid) -> Result<RecordKey> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            return Err(Error::NotFound(format!("Note {}", id)));
        }
        Ok(RecordKey::Note(id))
    }

    // ---- tasks ----

    pub fn add_task(&mut self, text: &str) -> Option<RecordKey> {
        if text.trim().is_empty() {
            return None;
        }
        let id = Uuid::new_v4();
        self.tasks.insert(
            0,
            Task {
                id,
                text: text.to_string(),
                completed: false,
                reminder: None,
            },
        );
        Some(RecordKey::Task(id))
    }

    fn task_mut(&mut self, id: Uuid) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
    }

    pub fn toggle_task(&mut self, id: Uuid) -> Result<RecordKey> {
        let task = self.task_mut(id)?;
        task.completed = !task.completed;
        Ok(RecordKey::Task(id))
    }

    pub fn delete_task(&mut self, id: Uuid) -> Result<RecordKey> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(Error::NotFound(format!("Task {}", id)));
        }
        Ok(RecordKey::Task(id))
    }

    pub fn set_reminder(&mut self, id: Uuid, reminder: Option<DateTime<Utc>>) -> Result<RecordKey> {
        self.task_mut(id)?.reminder = reminder;
        Ok(RecordKey::Task(id))
    }

    /// Clear the reminder entirely; a new one must be set to be reminded again
    pub fn dismiss_reminder(&mut self, id: Uuid) -> Result<RecordKey> {
        self.set_reminder(id, None)
    }

    // ---- weekly goals ----

    pub fn add_goal(&mut self, description: &str, target: i64) -> Option<RecordKey> {
        if description.trim().is_empty() || target <= 0 {
            return None;
        }
        let id = Uuid::new_v4();
        self.goals.insert(
            0,
            WeeklyGoal {
                id,
                description: description.to_string(),
                target: u32::try_from(target).unwrap_or(u32::MAX),
                current: 0,
            },
        );
        Some(RecordKey::Goal(id))
    }

    /// Set progress, clamped to `0..=target`
    pub fn update_goal(&mut self, id: Uuid, current: i64) -> Result<RecordKey> {
        let goal = self
            .goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| Error::NotFound(format!("Goal {}", id)))?;
        let clamped = current.clamp(0, i64::from(goal.target));
        goal.current = clamped as u32;
        Ok(RecordKey::Goal(id))
    }

    pub fn delete_goal(&mut self, id: Uuid) -> Result<RecordKey> {
        let before = self.goals.len();
        self.goals.retain(|g| g.id != id);
        if self.goals.len() == before {
            return Err(Error::NotFound(format!("Goal {}", id)));
        }
        Ok(RecordKey::Goal(id))
    }

    // ---- favorites and answers ----

    /// Flip membership; returns whether the chapter is now a favorite
    pub fn toggle_favorite(&mut self, chapter_id: ChapterId) -> (bool, RecordKey) {
        let now_favorite = if self.favorites.remove(&chapter_id) {
            false
        } else {
            self.favorites.insert(chapter_id);
            true
        };
        debug!(chapter_id, now_favorite, "Favorite toggled");
        (now_favorite, RecordKey::Favorite(chapter_id))
    }

    pub fn set_answer(&mut self, key: &str, value: FormValue) -> Result<RecordKey> {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("Answer key must not be empty".to_string()));
        }
        self.answers.insert(key.to_string(), value);
        Ok(RecordKey::Answer(key.to_string()))
    }

    // ---- derived ----

    pub fn completed_chapters(
        &self,
        catalog: &CourseCatalog,
        requirements: &CompletionRequirements,
    ) -> BTreeSet<ChapterId> {
        compute_completed_chapters(catalog.chapters(), requirements, &self.answers, self.tier())
    }

    pub fn progress(&self, catalog: &CourseCatalog, requirements: &CompletionRequirements) -> u8 {
        progress_percentage(
            self.completed_chapters(catalog, requirements).len(),
            catalog.len(),
        )
    }
}
