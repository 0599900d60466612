//! Sign-in, sign-out, account deletion and the caller's own profile

use axum::{extract::State, http::StatusCode, Json};
use cpm_common::db::retry_with_backoff;
use cpm_common::db::user_data::delete_user;
use cpm_common::workspace::UserProfile;
use cpm_common::Tier;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::accounts;
use crate::identity::Identity;
use crate::session::{close_session, stop_session, Session};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub profile: UserProfile,
    pub is_staff: bool,
    pub can_access_backoffice: bool,
    pub is_admin: bool,
}

async fn view(session: &Session) -> SessionView {
    let ws = session.read().await;
    let profile = ws.profile().clone();
    SessionView {
        is_staff: profile.is_staff(),
        can_access_backoffice: profile.can_access_backoffice(),
        is_admin: profile.is_admin(),
        profile,
    }
}

/// GET /api/session
pub async fn current_session(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<SessionView>> {
    let session = state.session(&identity).await?;
    Ok(Json(view(&session).await))
}

/// POST /api/session
pub async fn sign_in(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<SessionView>> {
    let session = accounts::sign_in(&state, &identity).await?;
    Ok(Json(view(&session).await))
}

/// DELETE /api/session
///
/// Flushes pending writes, stops the reminder timers and drops all
/// in-memory state for the caller.
pub async fn sign_out(State(state): State<AppState>, identity: Identity) -> StatusCode {
    if let Some(session) = state.sessions.remove(&identity.email).await {
        close_session(session, &state.persister).await;
    }
    StatusCode::NO_CONTENT
}

/// DELETE /api/account
///
/// Removes every record owned by the caller, then signs out. Staff accounts
/// are managed by an administrator instead.
pub async fn delete_account(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<StatusCode> {
    let session = state.session(&identity).await?;
    let (user_id, is_staff) = {
        let ws = session.read().await;
        (ws.user_id().to_string(), ws.profile().is_staff())
    };
    if is_staff {
        return Err(ApiError::Forbidden(
            "Staff accounts are removed by an administrator".to_string(),
        ));
    }
    drop(session);

    if let Some(session) = state.sessions.remove(&identity.email).await {
        stop_session(session).await;
    }

    let result = retry_with_backoff("delete account", state.persister.policy(), || {
        delete_user(&state.db, &user_id)
    })
    .await;
    match result {
        Ok(_) => info!(user_id = %user_id, "Account deleted"),
        Err(e) => error!(user_id = %user_id, error = %e, "Account data not deleted"),
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let session = state.session(&identity).await?;
    let profile = session
        .mutate(&state.persister, |ws| {
            let key = ws.update_profile(&payload.name, payload.avatar_url.as_deref())?;
            Ok((ws.profile().clone(), Some(key)))
        })
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct ChangeTierRequest {
    pub tier: Tier,
}

/// POST /api/tier
pub async fn change_tier(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ChangeTierRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = state.session(&identity).await?;
    if session.read().await.profile().is_staff() {
        return Err(ApiError::BadRequest(
            "Staff accounts always hold the Complete tier".to_string(),
        ));
    }

    session
        .mutate(&state.persister, |ws| Ok(((), Some(ws.set_tier(payload.tier)))))
        .await?;
    info!(email = %identity.email, tier = %payload.tier, "Tier changed");
    Ok(Json(view(&session).await))
}
