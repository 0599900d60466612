//! Event types and the broadcast event bus
//!
//! Events are emitted by sessions (reminders, chapter completion) and by the
//! back office (announcements), and streamed to clients over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::content::ChapterId;
use crate::workspace::{Announcement, GlobalNotification};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CpmEvent {
    /// A reminder poll found tasks that were not due on the previous poll
    RemindersDue {
        user_id: String,
        newly_due: Vec<Uuid>,
        /// Size of the active reminder set after the poll
        active_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Notification bell started or stopped ringing
    BellRinging {
        /// `None` for a bell rung for every user (announcements)
        user_id: Option<String>,
        ringing: bool,
        timestamp: DateTime<Utc>,
    },

    /// Staff published or cleared the global announcement
    AnnouncementPublished {
        announcement: Option<Announcement>,
        notification: Option<GlobalNotification>,
        timestamp: DateTime<Utc>,
    },

    /// A chapter's requirements became fully satisfied
    ChapterCompleted {
        user_id: String,
        chapter_id: ChapterId,
        timestamp: DateTime<Utc>,
    },
}

impl CpmEvent {
    /// Get event type as string for SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            CpmEvent::RemindersDue { .. } => "RemindersDue",
            CpmEvent::BellRinging { .. } => "BellRinging",
            CpmEvent::AnnouncementPublished { .. } => "AnnouncementPublished",
            CpmEvent::ChapterCompleted { .. } => "ChapterCompleted",
        }
    }

    /// Whether a signed-in user should receive this event
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        match self {
            CpmEvent::RemindersDue { user_id: owner, .. }
            | CpmEvent::ChapterCompleted { user_id: owner, .. } => owner == user_id,
            CpmEvent::BellRinging { user_id: owner, .. } => {
                owner.as_deref().map_or(true, |o| o == user_id)
            }
            CpmEvent::AnnouncementPublished { .. } => true,
        }
    }
}

/// Application-wide event distribution over `tokio::sync::broadcast`
///
/// Slow subscribers never block producers; they observe a lag error instead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CpmEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Receive all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<CpmEvent> {
        self.tx.subscribe()
    }

    /// Emit to all subscribers; `Err` when nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: CpmEvent) -> Result<usize, broadcast::error::SendError<CpmEvent>> {
        self.tx.send(event)
    }

    /// Emit, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: CpmEvent) {
        let _ = self.emit(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
