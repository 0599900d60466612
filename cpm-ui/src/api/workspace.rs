//! Notes, tasks with reminders, and weekly goals
//!
//! Adds with blank text (or a non-positive goal target) are accepted and
//! ignored: the response reports `created: false`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cpm_common::time::parse_reminder;
use cpm_common::workspace::{Note, RecordKey, Task, WeeklyGoal};
use serde::Deserialize;
use uuid::Uuid;

use super::Created;
use crate::identity::Identity;
use crate::{ApiError, ApiResult, AppState};

// ---- notes ----

/// GET /api/notes
pub async fn list_notes(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<Note>>> {
    let session = state.session(&identity).await?;
    let notes = session.read().await.notes().to_vec();
    Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

/// POST /api/notes
pub async fn add_note(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<NoteRequest>,
) -> ApiResult<Json<Created<Note>>> {
    let session = state.session(&identity).await?;
    let note = session
        .mutate(&state.persister, |ws| {
            let key = ws.add_note(&payload.content);
            let note = match &key {
                Some(RecordKey::Note(id)) => ws.note(*id).cloned(),
                _ => None,
            };
            Ok((note, key))
        })
        .await?;
    Ok(Json(Created::from_option(note)))
}

/// PUT /api/notes/:id
pub async fn edit_note(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<NoteRequest>,
) -> ApiResult<Json<Note>> {
    let session = state.session(&identity).await?;
    let note = session
        .mutate(&state.persister, |ws| {
            let key = ws.edit_note(id, &payload.content)?;
            let note = ws.note(id).cloned();
            Ok((note, Some(key)))
        })
        .await?;
    note.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Note {}", id)))
}

/// DELETE /api/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let session = state.session(&identity).await?;
    session
        .mutate(&state.persister, |ws| Ok(((), Some(ws.delete_note(id)?))))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- tasks ----

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<Task>>> {
    let session = state.session(&identity).await?;
    let tasks = session.read().await.tasks().to_vec();
    Ok(Json(tasks))
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub text: String,
}

/// POST /api/tasks
pub async fn add_task(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<TaskRequest>,
) -> ApiResult<Json<Created<Task>>> {
    let session = state.session(&identity).await?;
    let task = session
        .mutate(&state.persister, |ws| {
            let key = ws.add_task(&payload.text);
            let task = match &key {
                Some(RecordKey::Task(id)) => ws.task(*id).cloned(),
                _ => None,
            };
            Ok((task, key))
        })
        .await?;
    Ok(Json(Created::from_option(task)))
}

/// POST /api/tasks/:id/toggle
///
/// The task leaves the active reminder set immediately.
pub async fn toggle_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let session = state.session(&identity).await?;
    let task = session
        .mutate(&state.persister, |ws| {
            let key = ws.toggle_task(id)?;
            Ok((ws.task(id).cloned(), Some(key)))
        })
        .await?;
    session.forget_reminder(id);
    task.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {}", id)))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let session = state.session(&identity).await?;
    session
        .mutate(&state.persister, |ws| Ok(((), Some(ws.delete_task(id)?))))
        .await?;
    session.forget_reminder(id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    /// RFC 3339 or `YYYY-MM-DDTHH:MM[:SS]` (UTC); `null` clears the reminder
    pub reminder: Option<String>,
}

/// PUT /api/tasks/:id/reminder
pub async fn set_reminder(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReminderRequest>,
) -> ApiResult<Json<Task>> {
    let reminder = payload
        .reminder
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_reminder)
        .transpose()?;

    let session = state.session(&identity).await?;
    let task = session
        .mutate(&state.persister, |ws| {
            let key = ws.set_reminder(id, reminder)?;
            Ok((ws.task(id).cloned(), Some(key)))
        })
        .await?;
    if reminder.is_none() {
        session.forget_reminder(id);
    }
    task.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {}", id)))
}

/// DELETE /api/tasks/:id/reminder
///
/// Dismissal clears the reminder entirely.
pub async fn dismiss_reminder(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let session = state.session(&identity).await?;
    let task = session
        .mutate(&state.persister, |ws| {
            let key = ws.dismiss_reminder(id)?;
            Ok((ws.task(id).cloned(), Some(key)))
        })
        .await?;
    session.forget_reminder(id);
    task.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {}", id)))
}

// ---- weekly goals ----

/// GET /api/goals
pub async fn list_goals(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<WeeklyGoal>>> {
    let session = state.session(&identity).await?;
    let goals = session.read().await.goals().to_vec();
    Ok(Json(goals))
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub description: String,
    pub target: i64,
}

/// POST /api/goals
pub async fn add_goal(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<GoalRequest>,
) -> ApiResult<Json<Created<WeeklyGoal>>> {
    let session = state.session(&identity).await?;
    let goal = session
        .mutate(&state.persister, |ws| {
            let key = ws.add_goal(&payload.description, payload.target);
            let goal = match &key {
                Some(RecordKey::Goal(id)) => ws.goal(*id).cloned(),
                _ => None,
            };
            Ok((goal, key))
        })
        .await?;
    Ok(Json(Created::from_option(goal)))
}

#[derive(Debug, Deserialize)]
pub struct GoalProgressRequest {
    pub current: i64,
}

/// PUT /api/goals/:id
///
/// Progress is clamped to `0..=target`.
pub async fn update_goal(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<GoalProgressRequest>,
) -> ApiResult<Json<WeeklyGoal>> {
    let session = state.session(&identity).await?;
    let goal = session
        .mutate(&state.persister, |ws| {
            let key = ws.update_goal(id, payload.current)?;
            Ok((ws.goal(id).cloned(), Some(key)))
        })
        .await?;
    goal.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Goal {}", id)))
}

/// DELETE /api/goals/:id
pub async fn delete_goal(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let session = state.session(&identity).await?;
    session
        .mutate(&state.persister, |ws| Ok(((), Some(ws.delete_goal(id)?))))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
