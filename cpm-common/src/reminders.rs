//! Task reminder polling and the notification bell
//!
//! Every poll interval (15 s by default) the active reminder set is recomputed
//! as all incomplete tasks whose reminder is at or before now. If the new set
//! contains a task that was not active after the previous poll, the bell rings
//! for the ring duration (1 s by default) and then stops on its own. A task that
//! stays due keeps its place in the active set without ringing again.
//!
//! Cancelling the scheduler (or dropping its handle) stops both the poll timer
//! and any pending ring-off timer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReminderConfig;
use crate::events::{CpmEvent, EventBus};
use crate::workspace::{Task, UserWorkspace};

/// IDs of incomplete tasks due at `now`, in task order
pub fn due_reminders(tasks: &[Task], now: DateTime<Utc>) -> Vec<Uuid> {
    tasks.iter().filter(|t| t.is_due(now)).map(|t| t.id).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Due now but not active after the previous poll
    pub newly_due: Vec<Uuid>,
    pub active: Vec<Uuid>,
}

impl PollOutcome {
    pub fn should_ring(&self) -> bool {
        !self.newly_due.is_empty()
    }
}

/// The active reminder set carried between polls
#[derive(Debug, Clone, Default)]
pub struct ReminderTracker {
    active: Vec<Uuid>,
}

impl ReminderTracker {
    pub fn poll(&mut self, tasks: &[Task], now: DateTime<Utc>) -> PollOutcome {
        let due = due_reminders(tasks, now);
        let newly_due = due
            .iter()
            .filter(|id| !self.active.contains(id))
            .copied()
            .collect();
        self.active = due.clone();
        PollOutcome {
            newly_due,
            active: due,
        }
    }

    /// Drop a task from the active set (toggled, deleted or dismissed)
    pub fn forget(&mut self, task_id: Uuid) -> bool {
        let before = self.active.len();
        self.active.retain(|id| *id != task_id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[Uuid] {
        &self.active
    }
}

/// Observable scheduler state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderStatus {
    pub active: Vec<Uuid>,
    pub ringing: bool,
}

struct Shared {
    tracker: Mutex<ReminderTracker>,
    status: watch::Sender<ReminderStatus>,
}

impl Shared {
    fn publish_active(&self, active: Vec<Uuid>) {
        self.status.send_modify(|s| s.active = active);
    }

    fn set_ringing(&self, ringing: bool) {
        self.status.send_modify(|s| s.ringing = ringing);
    }
}

/// Spawns the per-user reminder loop
pub struct ReminderScheduler;

impl ReminderScheduler {
    pub fn spawn(
        workspace: Arc<RwLock<UserWorkspace>>,
        bus: EventBus,
        config: ReminderConfig,
        cancel: CancellationToken,
    ) -> ReminderHandle {
        let (status_tx, status_rx) = watch::channel(ReminderStatus::default());
        let shared = Arc::new(Shared {
            tracker: Mutex::new(ReminderTracker::default()),
            status: status_tx,
        });

        let join = tokio::spawn(run_loop(
            workspace,
            bus,
            config,
            cancel.clone(),
            Arc::clone(&shared),
        ));

        ReminderHandle {
            status: status_rx,
            shared,
            cancel,
            join: Some(join),
        }
    }
}

async fn run_loop(
    workspace: Arc<RwLock<UserWorkspace>>,
    bus: EventBus,
    config: ReminderConfig,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) {
    let user_id = workspace.read().await.user_id().to_string();
    let period = config.poll_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ring_off = sleep(config.ring_duration());
    tokio::pin!(ring_off);
    let mut ring_pending = false;

    info!(user_id = %user_id, poll_ms = config.poll_interval_ms, "Reminder scheduler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let tasks = workspace.read().await.tasks().to_vec();
                let outcome = match shared.tracker.lock() {
                    Ok(mut tracker) => tracker.poll(&tasks, crate::time::now()),
                    Err(e) => {
                        warn!(user_id = %user_id, "Reminder tracker lock poisoned: {}", e);
                        break;
                    }
                };
                shared.publish_active(outcome.active.clone());

                if outcome.should_ring() {
                    debug!(user_id = %user_id, newly_due = outcome.newly_due.len(), "Reminders due");
                    bus.emit_lossy(CpmEvent::RemindersDue {
                        user_id: user_id.clone(),
                        newly_due: outcome.newly_due.clone(),
                        active_count: outcome.active.len(),
                        timestamp: crate::time::now(),
                    });
                    shared.set_ringing(true);
                    bus.emit_lossy(CpmEvent::BellRinging {
                        user_id: Some(user_id.clone()),
                        ringing: true,
                        timestamp: crate::time::now(),
                    });
                    ring_off.as_mut().reset(Instant::now() + config.ring_duration());
                    ring_pending = true;
                }
            }

            _ = &mut ring_off, if ring_pending => {
                ring_pending = false;
                shared.set_ringing(false);
                bus.emit_lossy(CpmEvent::BellRinging {
                    user_id: Some(user_id.clone()),
                    ringing: false,
                    timestamp: crate::time::now(),
                });
            }
        }
    }

    shared.set_ringing(false);
    info!(user_id = %user_id, "Reminder scheduler stopped");
}

/// Owner of a running scheduler; dropping it cancels the timers
pub struct ReminderHandle {
    status: watch::Receiver<ReminderStatus>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl ReminderHandle {
    pub fn status(&self) -> ReminderStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReminderStatus> {
        self.status.clone()
    }

    /// Remove a task from the active set without waiting for the next poll
    pub fn forget(&self, task_id: Uuid) {
        let active = match self.shared.tracker.lock() {
            Ok(mut tracker) => {
                if !tracker.forget(task_id) {
                    return;
                }
                tracker.active().to_vec()
            }
            Err(e) => {
                warn!("Reminder tracker lock poisoned: {}", e);
                return;
            }
        };
        self.shared.publish_active(active);
    }

    /// Stop the timers without waiting for the loop to exit
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Cancel the timers and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Reminder scheduler task failed: {}", e);
            }
        }
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
