//! Account resolution for sign-in and the back office
//!
//! Staff and students share the `profiles` table; staff rows carry a role.
//! Staff always work with the Complete tier. An e-mail that matches no
//! profile becomes a new Free student, if sign-ups are open.

use chrono::Utc;
use cpm_common::content::{compute_completed_chapters, progress_percentage};
use cpm_common::db::user_data::{
    find_profile, find_profile_by_email, list_profiles, load_answers, load_workspace,
    upsert_profile,
};
use cpm_common::workspace::{
    default_avatar_url, RecordKey, Role, StudentSummary, UserProfile, UserWorkspace,
};
use cpm_common::Tier;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::identity::{normalize_email, Identity};
use crate::session::Session;
use crate::{ApiError, ApiResult, AppState};

pub fn new_user_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn new_profile(id: String, name: &str, email: &str, tier: Tier, role: Option<Role>) -> UserProfile {
    UserProfile {
        avatar_url: default_avatar_url(&id),
        id,
        name: name.trim().to_string(),
        email: normalize_email(email),
        tier,
        role,
        joined_at: Utc::now(),
    }
}

/// Reject blank names and malformed e-mails
pub fn validate_details(name: &str, email: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".to_string()));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest(format!("Invalid e-mail: {}", email)));
    }
    Ok(())
}

/// Fail with 409 when `email` belongs to a profile other than `except_id`
pub async fn ensure_email_free(db: &SqlitePool, email: &str, except_id: Option<&str>) -> ApiResult<()> {
    if let Some(existing) = find_profile_by_email(db, email).await? {
        if Some(existing.id.as_str()) != except_id {
            return Err(ApiError::Conflict(format!("E-mail already in use: {}", email)));
        }
    }
    Ok(())
}

/// Start (or return the existing) session for the caller
pub async fn sign_in(state: &AppState, identity: &Identity) -> ApiResult<Arc<Session>> {
    if let Some(existing) = state.sessions.get(&identity.email).await {
        return Ok(existing);
    }

    let (mut workspace, created) = match find_profile_by_email(&state.db, &identity.email).await? {
        Some(profile) => (load_workspace(&state.db, profile).await?, false),
        None => {
            if !state.course.read().await.admin.new_signups {
                return Err(ApiError::Forbidden("New sign-ups are disabled".to_string()));
            }

            let id = match &identity.user_id {
                Some(id) if find_profile(&state.db, id).await?.is_none() => id.clone(),
                _ => new_user_id("usr"),
            };
            let profile = new_profile(id, &identity.display_name(), &identity.email, Tier::Free, None);
            info!(user_id = %profile.id, email = %profile.email, "New student account");
            (UserWorkspace::new(profile), true)
        }
    };

    if workspace.profile().is_staff() {
        workspace.set_tier(Tier::Complete);
    }

    let session = Session::start(
        identity.email.clone(),
        workspace,
        state.bus.clone(),
        state.reminders,
        state.shutdown.child_token(),
    );
    let session = state.sessions.insert(session).await;

    if created {
        session
            .mutate(&state.persister, |_| Ok(((), Some(RecordKey::Profile))))
            .await?;
    }

    Ok(session)
}

/// Ensure the configured administrator account exists
///
/// An existing student with that e-mail is promoted.
pub async fn bootstrap_admin(db: &SqlitePool, email: &str) -> cpm_common::Result<bool> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Ok(false);
    }

    match find_profile_by_email(db, &email).await? {
        Some(profile) if profile.is_admin() => Ok(false),
        Some(mut profile) => {
            profile.role = Some(Role::Administrator);
            profile.tier = Tier::Complete;
            upsert_profile(db, &profile).await?;
            info!(email = %email, "Promoted existing account to administrator");
            Ok(true)
        }
        None => {
            let name = email.split('@').next().unwrap_or("admin").to_string();
            let profile = new_profile(
                new_user_id("stf"),
                &name,
                &email,
                Tier::Complete,
                Some(Role::Administrator),
            );
            upsert_profile(db, &profile).await?;
            info!(email = %email, "Created administrator account");
            Ok(true)
        }
    }
}

/// Student list with progress derived from each student's answers
///
/// Signed-in students report their live in-memory progress.
pub async fn student_summaries(state: &AppState) -> ApiResult<Vec<StudentSummary>> {
    let students = list_profiles(&state.db, false).await?;
    let catalog = state.course.read().await.catalog.clone();

    let mut summaries = Vec::with_capacity(students.len());
    for profile in students {
        let progress = match state.sessions.find_by_user_id(&profile.id).await {
            Some(session) => session.read().await.progress(&catalog, &state.requirements),
            None => {
                let answers = load_answers(&state.db, &profile.id).await?;
                let completed = compute_completed_chapters(
                    catalog.chapters(),
                    &state.requirements,
                    &answers,
                    profile.tier,
                );
                progress_percentage(completed.len(), catalog.len())
            }
        };
        summaries.push(StudentSummary { profile, progress });
    }
    Ok(summaries)
}
