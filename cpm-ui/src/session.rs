//! Signed-in sessions
//!
//! A session owns the user's in-memory workspace, its reminder scheduler and
//! the dirty set of records awaiting a retried write. Sessions are keyed by
//! normalized e-mail. Dropping a session cancels its reminder timers.

use cpm_common::config::ReminderConfig;
use cpm_common::events::EventBus;
use cpm_common::reminders::{ReminderHandle, ReminderScheduler, ReminderStatus};
use cpm_common::workspace::{RecordKey, UserWorkspace};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::persistence::{DirtySet, Persister};

pub struct Session {
    email: String,
    workspace: Arc<RwLock<UserWorkspace>>,
    reminders: ReminderHandle,
    dirty: DirtySet,
    /// Global notifications this session dismissed
    dismissed: std::sync::Mutex<HashSet<Uuid>>,
    banner_hidden: AtomicBool,
}

impl Session {
    /// Start a session and its reminder scheduler
    pub fn start(
        email: String,
        workspace: UserWorkspace,
        bus: EventBus,
        reminder_config: ReminderConfig,
        cancel: CancellationToken,
    ) -> Self {
        let workspace = Arc::new(RwLock::new(workspace));
        let reminders =
            ReminderScheduler::spawn(Arc::clone(&workspace), bus, reminder_config, cancel);
        Self {
            email,
            workspace,
            reminders,
            dirty: DirtySet::default(),
            dismissed: std::sync::Mutex::new(HashSet::new()),
            banner_hidden: AtomicBool::new(false),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, UserWorkspace> {
        self.workspace.read().await
    }

    pub fn workspace(&self) -> &Arc<RwLock<UserWorkspace>> {
        &self.workspace
    }

    pub fn reminder_status(&self) -> ReminderStatus {
        self.reminders.status()
    }

    /// Drop a task from the active reminder set immediately
    pub fn forget_reminder(&self, task_id: Uuid) {
        self.reminders.forget(task_id);
    }

    /// Apply a mutation and persist the record it reports
    ///
    /// Pending dirty records are flushed first. A persistence failure never
    /// fails the mutation.
    pub async fn mutate<T, F>(&self, persister: &Persister, apply: F) -> cpm_common::Result<T>
    where
        F: FnOnce(&mut UserWorkspace) -> cpm_common::Result<(T, Option<RecordKey>)>,
    {
        if !self.dirty.is_empty().await {
            persister.flush(&self.workspace, &self.dirty).await;
        }

        let (value, key) = {
            let mut ws = self.workspace.write().await;
            apply(&mut ws)?
        };

        if let Some(key) = key {
            persister.persist(&self.workspace, &self.dirty, key).await;
        }
        Ok(value)
    }

    /// Persist any dirty records, e.g. before sign-out
    pub async fn flush(&self, persister: &Persister) -> bool {
        persister.flush(&self.workspace, &self.dirty).await
    }

    pub async fn dirty_count(&self) -> usize {
        self.dirty.len().await
    }

    pub fn dismiss_notification(&self, id: Uuid) -> bool {
        match self.dismissed.lock() {
            Ok(mut dismissed) => dismissed.insert(id),
            Err(_) => false,
        }
    }

    /// Forget dismissals of notifications no longer listed
    pub fn retain_dismissed(&self, live: &HashSet<Uuid>) {
        if let Ok(mut dismissed) = self.dismissed.lock() {
            dismissed.retain(|id| live.contains(id));
        }
    }

    pub fn is_dismissed(&self, id: Uuid) -> bool {
        self.dismissed
            .lock()
            .map(|d| d.contains(&id))
            .unwrap_or(false)
    }

    pub fn hide_banner(&self) {
        self.banner_hidden.store(true, Ordering::Relaxed);
    }

    pub fn show_banner(&self) {
        self.banner_hidden.store(false, Ordering::Relaxed);
    }

    pub fn banner_hidden(&self) -> bool {
        self.banner_hidden.load(Ordering::Relaxed)
    }

    /// Stop the reminder timers and wait for them to exit
    pub async fn close(self) {
        self.reminders.shutdown().await;
    }
}

/// All signed-in sessions
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, email: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(email).cloned()
    }

    /// Register a session unless one already exists for the same e-mail
    ///
    /// Returns the registered session; a losing concurrent sign-in gets the
    /// existing one and its own session is dropped.
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(session.email()) {
            return Arc::clone(existing);
        }
        let session = Arc::new(session);
        sessions.insert(session.email().to_string(), Arc::clone(&session));
        info!(email = %session.email(), active = sessions.len(), "Session started");
        session
    }

    pub async fn remove(&self, email: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(email);
        if removed.is_some() {
            info!(email, "Session ended");
        }
        removed
    }

    /// Session of a user by profile id
    pub async fn find_by_user_id(&self, user_id: &str) -> Option<Arc<Session>> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        for session in sessions {
            if session.read().await.user_id() == user_id {
                return Some(session);
            }
        }
        None
    }

    pub async fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Flush a removed session's dirty records, then stop it
///
/// Returns how many records could not be written.
pub async fn close_session(session: Arc<Session>, persister: &Persister) -> usize {
    let pending = if session.flush(persister).await {
        0
    } else {
        session.dirty_count().await
    };
    if pending > 0 {
        warn!(email = %session.email(), pending, "Session closed with unsaved records");
    }
    stop_session(session).await;
    pending
}

/// Stop a removed session without writing anything
pub async fn stop_session(session: Arc<Session>) {
    match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        // in-flight requests still hold references; their drop finishes the job
        Err(shared) => shared.reminders.cancel(),
    }
}
