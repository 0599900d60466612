//! Back office: course configuration, announcements, students and staff
//!
//! Either staff role may use the back office. Admin settings and staff
//! management are restricted to administrators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cpm_common::content::{ChapterConfig, ChapterDetails, ChapterId};
use cpm_common::dashboard::{AdminSettings, DashboardLayout, WidgetId, WidgetTiers};
use cpm_common::db::kv::keys;
use cpm_common::db::user_data::{delete_user, find_profile, list_profiles, upsert_profile};
use cpm_common::events::CpmEvent;
use cpm_common::workspace::{
    Announcement, GlobalNotification, Role, StudentSummary, UserProfile,
};
use cpm_common::Tier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::accounts::{
    ensure_email_free, new_profile, new_user_id, student_summaries, validate_details,
};
use crate::identity::{normalize_email, Identity};
use crate::session::{close_session, stop_session, Session};
use crate::{ApiError, ApiResult, AppState};

async fn require_staff(state: &AppState, identity: &Identity) -> ApiResult<Arc<Session>> {
    let session = state.session(identity).await?;
    if !session.read().await.profile().can_access_backoffice() {
        return Err(ApiError::Forbidden("Back office requires a staff role".to_string()));
    }
    Ok(session)
}

async fn require_admin(state: &AppState, identity: &Identity) -> ApiResult<Arc<Session>> {
    let session = state.session(identity).await?;
    if !session.read().await.profile().is_admin() {
        return Err(ApiError::Forbidden("Administrator role required".to_string()));
    }
    Ok(session)
}

// ---- settings and announcement ----

/// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<AdminSettings>> {
    require_admin(&state, &identity).await?;
    Ok(Json(state.course.read().await.admin))
}

/// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    identity: Identity,
    Json(settings): Json<AdminSettings>,
) -> ApiResult<Json<AdminSettings>> {
    require_admin(&state, &identity).await?;
    state.course.write().await.admin = settings;
    state.save_setting(keys::ADMIN_SETTINGS, &settings).await;
    info!(?settings, "Admin settings updated");
    Ok(Json(settings))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub announcement: Announcement,
    pub notification: Option<GlobalNotification>,
}

/// PUT /api/admin/announcement
///
/// Re-shows the banner for every session. Notification display types also
/// push a global notification and ring every bell.
pub async fn publish_announcement(
    State(state): State<AppState>,
    identity: Identity,
    Json(announcement): Json<Announcement>,
) -> ApiResult<Json<PublishResponse>> {
    require_staff(&state, &identity).await?;
    if announcement.message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Announcement message must not be empty".to_string(),
        ));
    }

    let notification = announcement
        .display_type
        .pushes_notification()
        .then(|| GlobalNotification {
            id: Uuid::new_v4(),
            message: announcement.message.clone(),
        });

    let live = {
        let mut course = state.course.write().await;
        course.announcement = Some(announcement.clone());
        notification
            .as_ref()
            .map(|n| course.push_notification(n.clone()))
    };
    for session in state.sessions.all().await {
        session.show_banner();
        if let Some(live) = &live {
            session.retain_dismissed(live);
        }
    }
    state
        .save_setting(keys::ANNOUNCEMENT, &Some(announcement.clone()))
        .await;

    info!(display_type = ?announcement.display_type, "Announcement published");
    state.bus.emit_lossy(CpmEvent::AnnouncementPublished {
        announcement: Some(announcement.clone()),
        notification: notification.clone(),
        timestamp: cpm_common::time::now(),
    });
    if notification.is_some() {
        ring_global_bell(&state);
    }

    Ok(Json(PublishResponse {
        announcement,
        notification,
    }))
}

/// Ring every user's bell for the configured ring duration
///
/// A later ring extends the bell; only its own timer silences it.
fn ring_global_bell(state: &AppState) {
    let generation = state.global_bell.ring();
    state.bus.emit_lossy(CpmEvent::BellRinging {
        user_id: None,
        ringing: true,
        timestamp: cpm_common::time::now(),
    });

    let bell = Arc::clone(&state.global_bell);
    let bus = state.bus.clone();
    let duration = state.reminders.ring_duration();
    let cancel = state.shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
        if bell.release(generation) {
            bus.emit_lossy(CpmEvent::BellRinging {
                user_id: None,
                ringing: false,
                timestamp: cpm_common::time::now(),
            });
        } else {
            debug!(generation, "Bell rung again, leaving it ringing");
        }
    });
}

/// DELETE /api/admin/announcement
pub async fn clear_announcement(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<StatusCode> {
    require_staff(&state, &identity).await?;
    state.course.write().await.announcement = None;
    state.clear_setting(keys::ANNOUNCEMENT).await;
    state.bus.emit_lossy(CpmEvent::AnnouncementPublished {
        announcement: None,
        notification: None,
        timestamp: cpm_common::time::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

// ---- chapters ----

/// GET /api/admin/chapters
pub async fn list_chapters(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<ChapterConfig>>> {
    require_staff(&state, &identity).await?;
    Ok(Json(state.course.read().await.catalog.chapters().to_vec()))
}

#[derive(Debug, Serialize)]
pub struct ChapterCreated {
    pub id: ChapterId,
}

/// POST /api/admin/chapters
pub async fn add_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Json(details): Json<ChapterDetails>,
) -> ApiResult<(StatusCode, Json<ChapterCreated>)> {
    require_staff(&state, &identity).await?;
    let (id, catalog) = {
        let mut course = state.course.write().await;
        let id = course.catalog.add_chapter(details)?;
        (id, course.catalog.clone())
    };
    state.save_setting(keys::CHAPTER_CONFIGS, &catalog).await;
    info!(chapter_id = id, "Chapter added");
    Ok((StatusCode::CREATED, Json(ChapterCreated { id })))
}

/// PUT /api/admin/chapters/:id
pub async fn update_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<ChapterId>,
    Json(details): Json<ChapterDetails>,
) -> ApiResult<Json<ChapterConfig>> {
    require_staff(&state, &identity).await?;
    let (updated, catalog) = {
        let mut course = state.course.write().await;
        course.catalog.update_chapter(id, details)?;
        let updated = course
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Chapter {}", id)))?;
        (updated, course.catalog.clone())
    };
    state.save_setting(keys::CHAPTER_CONFIGS, &catalog).await;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<ChapterId>,
}

/// PUT /api/admin/chapters/order
pub async fn reorder_chapters(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<ChapterConfig>>> {
    require_staff(&state, &identity).await?;
    let catalog = {
        let mut course = state.course.write().await;
        course.catalog.reorder(&payload.order)?;
        course.catalog.clone()
    };
    state.save_setting(keys::CHAPTER_CONFIGS, &catalog).await;
    Ok(Json(catalog.chapters().to_vec()))
}

// ---- dashboard layout ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    pub layout: DashboardLayout,
    pub widget_tiers: WidgetTiers,
}

/// GET /api/admin/layout
pub async fn get_layout(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<LayoutView>> {
    require_staff(&state, &identity).await?;
    let course = state.course.read().await;
    Ok(Json(LayoutView {
        layout: course.layout.clone(),
        widget_tiers: course.widget_tiers.clone(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    #[serde(default)]
    pub main: Vec<WidgetId>,
    #[serde(default)]
    pub sidebar: Vec<WidgetId>,
}

/// PUT /api/admin/layout
///
/// A widget placed twice is rejected with 400.
pub async fn update_layout(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<LayoutRequest>,
) -> ApiResult<Json<DashboardLayout>> {
    require_staff(&state, &identity).await?;
    let layout = DashboardLayout::new(payload.main, payload.sidebar)?;
    state.course.write().await.layout = layout.clone();
    state.save_setting(keys::DASHBOARD_LAYOUT, &layout).await;
    Ok(Json(layout))
}

#[derive(Debug, Deserialize)]
pub struct TierRequest {
    pub tier: Tier,
}

/// PUT /api/admin/widgets/:id/tier
pub async fn set_widget_tier(
    State(state): State<AppState>,
    identity: Identity,
    Path(widget): Path<WidgetId>,
    Json(payload): Json<TierRequest>,
) -> ApiResult<Json<WidgetTiers>> {
    require_staff(&state, &identity).await?;
    let tiers = {
        let mut course = state.course.write().await;
        course.widget_tiers.set(widget, payload.tier);
        course.widget_tiers.clone()
    };
    state.save_setting(keys::WIDGET_TIERS, &tiers).await;
    Ok(Json(tiers))
}

// ---- students ----

async fn find_student(state: &AppState, id: &str) -> ApiResult<UserProfile> {
    match find_profile(&state.db, id).await? {
        Some(profile) if !profile.is_staff() => Ok(profile),
        _ => Err(ApiError::NotFound(format!("Student {}", id))),
    }
}

/// GET /api/admin/students
pub async fn list_students(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<StudentSummary>>> {
    require_staff(&state, &identity).await?;
    Ok(Json(student_summaries(&state).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewStudentRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub tier: Tier,
}

/// POST /api/admin/students
pub async fn add_student(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<NewStudentRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    require_staff(&state, &identity).await?;
    validate_details(&payload.name, &payload.email)?;
    ensure_email_free(&state.db, &payload.email, None).await?;

    let profile = new_profile(
        new_user_id("usr"),
        &payload.name,
        &payload.email,
        payload.tier,
        None,
    );
    upsert_profile(&state.db, &profile).await?;
    info!(user_id = %profile.id, "Student added");
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// PUT /api/admin/students/:id
///
/// Changing a signed-in student's e-mail ends their session.
pub async fn update_student(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDetailsRequest>,
) -> ApiResult<Json<UserProfile>> {
    require_staff(&state, &identity).await?;
    validate_details(&payload.name, &payload.email)?;
    let mut profile = find_student(&state, &id).await?;
    ensure_email_free(&state.db, &payload.email, Some(&id)).await?;

    let email_changed = normalize_email(&payload.email) != profile.email;
    let live = state.sessions.find_by_user_id(&id).await;

    match live {
        Some(session) if !email_changed => {
            let updated = session
                .mutate(&state.persister, |ws| {
                    let key = ws.update_profile(&payload.name, payload.avatar_url.as_deref())?;
                    Ok((ws.profile().clone(), Some(key)))
                })
                .await?;
            return Ok(Json(updated));
        }
        Some(session) => {
            drop(session);
            end_session_of(&state, &id).await;
            // the flush may have written a newer profile
            profile = find_student(&state, &id).await?;
        }
        None => {}
    }

    profile.name = payload.name.trim().to_string();
    profile.email = normalize_email(&payload.email);
    if let Some(url) = payload.avatar_url {
        profile.avatar_url = url;
    }
    upsert_profile(&state.db, &profile).await?;
    Ok(Json(profile))
}

/// PUT /api/admin/students/:id/tier
pub async fn set_student_tier(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<TierRequest>,
) -> ApiResult<Json<UserProfile>> {
    require_staff(&state, &identity).await?;
    let mut profile = find_student(&state, &id).await?;

    if let Some(session) = state.sessions.find_by_user_id(&id).await {
        let updated = session
            .mutate(&state.persister, |ws| {
                let key = ws.set_tier(payload.tier);
                Ok((ws.profile().clone(), Some(key)))
            })
            .await?;
        return Ok(Json(updated));
    }

    profile.tier = payload.tier;
    upsert_profile(&state.db, &profile).await?;
    info!(user_id = %id, tier = %payload.tier, "Student tier updated");
    Ok(Json(profile))
}

/// DELETE /api/admin/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_staff(&state, &identity).await?;
    find_student(&state, &id).await?;
    remove_account(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// End any session of the account, then delete all of its records
async fn remove_account(state: &AppState, user_id: &str) -> ApiResult<()> {
    if let Some(removed) = take_session_of(state, user_id).await {
        stop_session(removed).await;
    }
    delete_user(&state.db, user_id).await?;
    Ok(())
}

/// End any session of the account so the next sign-in reloads its profile
async fn end_session_of(state: &AppState, user_id: &str) {
    if let Some(removed) = take_session_of(state, user_id).await {
        close_session(removed, &state.persister).await;
    }
}

/// Unregister the account's session, leaving the caller the last reference
async fn take_session_of(state: &AppState, user_id: &str) -> Option<Arc<Session>> {
    let email = state
        .sessions
        .find_by_user_id(user_id)
        .await?
        .email()
        .to_string();
    state.sessions.remove(&email).await
}

// ---- staff ----

/// GET /api/admin/staff
pub async fn list_staff(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<UserProfile>>> {
    require_admin(&state, &identity).await?;
    Ok(Json(list_profiles(&state.db, true).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewStaffRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// POST /api/admin/staff
///
/// An existing student with the same e-mail is promoted in place.
pub async fn add_staff(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<NewStaffRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    require_admin(&state, &identity).await?;
    validate_details(&payload.name, &payload.email)?;

    let existing =
        cpm_common::db::user_data::find_profile_by_email(&state.db, &payload.email).await?;
    let profile = match existing {
        Some(p) if p.is_staff() => {
            return Err(ApiError::Conflict(format!(
                "Staff member already exists: {}",
                p.email
            )));
        }
        Some(student) => {
            end_session_of(&state, &student.id).await;
            let mut student = find_profile(&state.db, &student.id)
                .await?
                .unwrap_or(student);
            student.name = payload.name.trim().to_string();
            student.role = Some(payload.role);
            student.tier = Tier::Complete;
            info!(user_id = %student.id, role = %payload.role, "Student promoted to staff");
            student
        }
        None => new_profile(
            new_user_id("stf"),
            &payload.name,
            &payload.email,
            Tier::Complete,
            Some(payload.role),
        ),
    };

    upsert_profile(&state.db, &profile).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// PUT /api/admin/staff/:id
///
/// Administrators cannot edit their own staff record.
pub async fn update_staff(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStaffRequest>,
) -> ApiResult<Json<UserProfile>> {
    let caller = require_admin(&state, &identity).await?;
    validate_details(&payload.name, &payload.email)?;

    let mut profile = match find_profile(&state.db, &id).await? {
        Some(p) if p.is_staff() => p,
        _ => return Err(ApiError::NotFound(format!("Staff member {}", id))),
    };
    if caller.read().await.user_id() == id {
        return Err(ApiError::BadRequest(
            "Update your own details through /api/profile".to_string(),
        ));
    }
    ensure_email_free(&state.db, &payload.email, Some(&id)).await?;

    end_session_of(&state, &id).await;
    if let Some(current) = find_profile(&state.db, &id).await? {
        profile = current;
    }

    profile.name = payload.name.trim().to_string();
    profile.email = normalize_email(&payload.email);
    profile.role = Some(payload.role);
    upsert_profile(&state.db, &profile).await?;
    Ok(Json(profile))
}

/// DELETE /api/admin/staff/:id
pub async fn delete_staff(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let caller = require_admin(&state, &identity).await?;
    if caller.read().await.user_id() == id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }
    match find_profile(&state.db, &id).await? {
        Some(p) if p.is_staff() => {}
        _ => return Err(ApiError::NotFound(format!("Staff member {}", id))),
    }
    remove_account(&state, &id).await?;
    info!(user_id = %id, "Staff member removed");
    Ok(StatusCode::NO_CONTENT)
}
