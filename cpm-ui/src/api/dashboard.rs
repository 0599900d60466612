//! Dashboard composition, reminder status and per-session notifications

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cpm_common::content::{next_step, ChapterConfig};
use cpm_common::dashboard::{
    earned_badges, resolve_layout, ActivityStats, BadgeStatus, ResolvedLayout,
};
use cpm_common::workspace::{Announcement, GlobalNotification, Task};
use serde::Serialize;
use uuid::Uuid;

use super::course::NextChapterView;
use crate::identity::Identity;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub layout: ResolvedLayout,
    pub next_chapter: Option<NextChapterView>,
    pub badges: Vec<BadgeStatus>,
    pub stats: ActivityStats,
    pub favorites: Vec<ChapterConfig>,
    pub maintenance_mode: bool,
    /// Shown unless maintenance mode is on or the session hid it
    pub banner: Option<Announcement>,
}

/// GET /api/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<DashboardView>> {
    let session = state.session(&identity).await?;
    let course = state.course.read().await;
    let ws = session.read().await;

    let completed = ws.completed_chapters(&course.catalog, &state.requirements);
    let layout = resolve_layout(&course.layout, &course.widget_tiers, ws.tier(), &course.admin);
    let next_chapter = next_step(course.catalog.chapters(), &completed, ws.tier()).map(|step| {
        NextChapterView {
            chapter: step.chapter.clone(),
            reason: step.reason,
        }
    });
    let stats = ActivityStats::compute(
        ws.notes(),
        ws.tasks(),
        ws.goals(),
        completed.len(),
        course.catalog.len(),
    );
    let favorites = course
        .catalog
        .chapters()
        .iter()
        .filter(|c| ws.favorites().contains(&c.id))
        .cloned()
        .collect();

    let banner = match &course.announcement {
        Some(a) if a.display_type.shows_banner()
            && !course.admin.maintenance_mode
            && !session.banner_hidden() =>
        {
            Some(a.clone())
        }
        _ => None,
    };

    Ok(Json(DashboardView {
        layout,
        next_chapter,
        badges: earned_badges(&completed),
        stats,
        favorites,
        maintenance_mode: course.admin.maintenance_mode,
        banner,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersView {
    /// Tasks whose reminders are currently due
    pub active: Vec<Task>,
    pub ringing: bool,
    pub notifications: Vec<GlobalNotification>,
}

/// GET /api/reminders
pub async fn get_reminders(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<RemindersView>> {
    let session = state.session(&identity).await?;
    let status = session.reminder_status();

    let active = {
        let ws = session.read().await;
        status
            .active
            .iter()
            .filter_map(|id| ws.task(*id).cloned())
            .collect()
    };
    let notifications = state
        .course
        .read()
        .await
        .notifications
        .iter()
        .filter(|n| !session.is_dismissed(n.id))
        .cloned()
        .collect();

    Ok(Json(RemindersView {
        active,
        ringing: status.ringing || state.global_bell.is_ringing(),
        notifications,
    }))
}

/// DELETE /api/notifications/:id
pub async fn dismiss_notification(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let session = state.session(&identity).await?;
    let known = state
        .course
        .read()
        .await
        .notifications
        .iter()
        .any(|n| n.id == id);
    if !known {
        return Err(ApiError::NotFound(format!("Notification {}", id)));
    }
    session.dismiss_notification(id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/announcement
///
/// Hides the banner for this session until the next announcement.
pub async fn hide_banner(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<StatusCode> {
    state.session(&identity).await?.hide_banner();
    Ok(StatusCode::NO_CONTENT)
}
