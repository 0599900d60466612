//! Integration tests for cpm-ui API endpoints
//!
//! Each test builds the router over a fresh in-memory database and drives it
//! with `oneshot`. Identity headers stand in for the authentication provider.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cpm_common::config::{PersistenceConfig, ReminderConfig};
use cpm_common::content::builtin;
use cpm_common::dashboard::{AdminSettings, DashboardLayout};
use cpm_common::db::kv::keys;
use cpm_common::db::user_data::find_profile;
use cpm_common::db::{init_memory_database, set_json};
use cpm_common::Tier;
use cpm_ui::{accounts, build_router, AppState};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN: &str = "admin@example.com";
const ALICE: &str = "alice@example.com";

/// Test helper: app state with one administrator
async fn setup_state(new_signups: bool) -> AppState {
    setup_state_with(new_signups, ReminderConfig::default()).await
}

async fn setup_state_with(new_signups: bool, reminders: ReminderConfig) -> AppState {
    let pool = init_memory_database().await.unwrap();
    let settings = AdminSettings {
        new_signups,
        ..AdminSettings::default()
    };
    set_json(&pool, keys::ADMIN_SETTINGS, &settings).await.unwrap();
    accounts::bootstrap_admin(&pool, ADMIN).await.unwrap();

    AppState::load(
        pool,
        builtin::default_library(),
        reminders,
        PersistenceConfig {
            max_attempts: 1,
            initial_backoff_ms: 1,
        },
    )
    .await
    .unwrap()
}

/// Test helper: send one request, returning status and JSON body (Null when empty)
async fn call(
    state: &AppState,
    method: &str,
    uri: &str,
    email: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = email {
        builder = builder.header("x-user-email", email);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn sign_in(state: &AppState, email: &str) -> Value {
    let (status, body) = call(state, "POST", "/api/session", Some(email), None).await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {}", body);
    body
}

// =============================================================================
// Health and sessions
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_session_required() {
    let state = setup_state(true).await;
    let (status, body) = call(&state, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cpm-ui");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_requests_without_identity_or_session_are_unauthorized() {
    let state = setup_state(true).await;

    let (status, body) = call(&state, "GET", "/api/chapters", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&state, "GET", "/api/chapters", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_becomes_free_student() {
    let state = setup_state(true).await;
    let body = sign_in(&state, ALICE).await;

    assert_eq!(body["profile"]["tier"], "Free");
    assert_eq!(body["profile"]["email"], ALICE);
    assert_eq!(body["isStaff"], false);

    // signing in twice keeps the same session
    let again = sign_in(&state, ALICE).await;
    assert_eq!(again["profile"]["id"], body["profile"]["id"]);
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_sign_in_refused_when_signups_closed() {
    let state = setup_state(false).await;
    let (status, body) = call(&state, "POST", "/api/session", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // existing accounts may still sign in
    let admin = sign_in(&state, ADMIN).await;
    assert_eq!(admin["isAdmin"], true);
}

#[tokio::test]
async fn test_staff_work_with_complete_tier() {
    let state = setup_state(true).await;
    let body = sign_in(&state, ADMIN).await;
    assert_eq!(body["profile"]["tier"], "Complete");
    assert_eq!(body["canAccessBackoffice"], true);

    let (status, _) = call(&state, "GET", "/api/chapters/11", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_keeps_data_for_next_sign_in() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;
    call(&state, "POST", "/api/notes", Some(ALICE), Some(json!({"content": "guardar"}))).await;

    let (status, _) = call(&state, "DELETE", "/api/session", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.sessions.is_empty().await);

    let (status, _) = call(&state, "GET", "/api/notes", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    sign_in(&state, ALICE).await;
    let (_, notes) = call(&state, "GET", "/api/notes", Some(ALICE), None).await;
    assert_eq!(notes[0]["content"], "guardar");
}

#[tokio::test]
async fn test_delete_account_removes_everything() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;
    call(&state, "POST", "/api/tasks", Some(ALICE), Some(json!({"text": "apagar"}))).await;

    let (status, _) = call(&state, "DELETE", "/api/account", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.sessions.get(ALICE).await.is_none());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = ?")
        .bind(ALICE)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 0);

    // a later sign-in starts over as a new Free student
    sign_in(&state, ALICE).await;
    let (_, tasks) = call(&state, "GET", "/api/tasks", Some(ALICE), None).await;
    assert_eq!(tasks, json!([]));
}

// =============================================================================
// Chapters, completion, search
// =============================================================================

#[tokio::test]
async fn test_chapter_list_flags_locked_chapters() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, chapters) = call(&state, "GET", "/api/chapters", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let chapters = chapters.as_array().unwrap();
    assert_eq!(chapters.len(), 12);
    assert_eq!(chapters[2]["locked"], false);
    assert_eq!(chapters[3]["locked"], true);
    assert_eq!(chapters[3]["shortTitle"], "O Método MPC");
}

#[tokio::test]
async fn test_locked_chapter_requires_tier() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, body) = call(&state, "GET", "/api/chapters/4", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "TIER_REQUIRED");
    assert_eq!(body["error"]["requiredTier"], "Essential");
    assert!(body.get("sections").is_none());

    let (status, body) = call(&state, "GET", "/api/chapters/0", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 0);
    assert_eq!(body["sections"][0]["type"], "quote");

    let (status, _) = call(&state, "GET", "/api/chapters/99", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upgrade_unlocks_chapter() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, body) = call(
        &state,
        "POST",
        "/api/tier",
        Some(ALICE),
        Some(json!({"tier": "Essencial"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["tier"], "Essential");

    let (status, _) = call(&state, "GET", "/api/chapters/4", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_answers_drive_progress_and_next_chapter() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (_, next) = call(&state, "GET", "/api/next-chapter", Some(ALICE), None).await;
    assert_eq!(next["chapter"]["id"], 0);
    assert_eq!(next["reason"], "incomplete");

    // a string "true" is not a checked box
    let (_, body) = call(
        &state,
        "PUT",
        "/api/answers/c0_commitment",
        Some(ALICE),
        Some(json!({"value": "true"})),
    )
    .await;
    assert_eq!(body["newlyCompleted"], json!([]));

    let (status, body) = call(
        &state,
        "PUT",
        "/api/answers/c0_commitment",
        Some(ALICE),
        Some(json!({"value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newlyCompleted"], json!([0]));

    let (_, progress) = call(&state, "GET", "/api/progress", Some(ALICE), None).await;
    assert_eq!(progress["completedChapters"], json!([0]));
    assert_eq!(progress["totalChapters"], 12);
    assert_eq!(progress["percentage"], 8);

    let (_, next) = call(&state, "GET", "/api/next-chapter", Some(ALICE), None).await;
    assert_eq!(next["chapter"]["id"], 1);
}

#[tokio::test]
async fn test_locked_chapter_answers_do_not_count() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (_, body) = call(
        &state,
        "PUT",
        "/api/answers/c4_test_executed",
        Some(ALICE),
        Some(json!({"value": true})),
    )
    .await;
    assert_eq!(body["completedChapters"], json!([]));

    call(&state, "POST", "/api/tier", Some(ALICE), Some(json!({"tier": "Essential"}))).await;
    let (_, progress) = call(&state, "GET", "/api/progress", Some(ALICE), None).await;
    assert_eq!(progress["completedChapters"], json!([4]));
}

#[tokio::test]
async fn test_search_lists_locked_matches() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, results) = call(&state, "GET", "/api/search?q=antifr", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let results = results.as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["chapterId"], 8);
    assert_eq!(results[0]["chapterTitle"], "O Modelo Antifrágil");
    assert_eq!(results[0]["isLocked"], true);

    let (_, short) = call(&state, "GET", "/api/search?q=an", Some(ALICE), None).await;
    assert_eq!(short, json!([]));
}

#[tokio::test]
async fn test_favorites_toggle() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (_, body) = call(&state, "POST", "/api/favorites/2", Some(ALICE), None).await;
    assert_eq!(body["favorite"], true);
    let (_, body) = call(&state, "POST", "/api/favorites/2", Some(ALICE), None).await;
    assert_eq!(body["favorite"], false);

    let (status, _) = call(&state, "POST", "/api/favorites/42", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Notes, tasks, goals
// =============================================================================

#[tokio::test]
async fn test_notes_newest_first_and_blank_ignored() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, body) =
        call(&state, "POST", "/api/notes", Some(ALICE), Some(json!({"content": "   "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);

    call(&state, "POST", "/api/notes", Some(ALICE), Some(json!({"content": "primeira"}))).await;
    let (_, body) =
        call(&state, "POST", "/api/notes", Some(ALICE), Some(json!({"content": "segunda"}))).await;
    assert_eq!(body["created"], true);
    let id = body["item"]["id"].as_str().unwrap().to_string();

    let (_, notes) = call(&state, "GET", "/api/notes", Some(ALICE), None).await;
    assert_eq!(notes[0]["content"], "segunda");
    assert_eq!(notes[1]["content"], "primeira");

    let uri = format!("/api/notes/{}", id);
    let (_, edited) = call(&state, "PUT", &uri, Some(ALICE), Some(json!({"content": "editada"}))).await;
    assert_eq!(edited["content"], "editada");

    let (status, _) = call(&state, "DELETE", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&state, "DELETE", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_lifecycle_with_reminder() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (_, body) =
        call(&state, "POST", "/api/tasks", Some(ALICE), Some(json!({"text": "Revisar"}))).await;
    assert_eq!(body["item"]["completed"], false);
    let id = body["item"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/tasks/{}/reminder", id);
    let (status, task) = call(
        &state,
        "PUT",
        &uri,
        Some(ALICE),
        Some(json!({"reminder": "2024-05-01T09:30"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["reminder"], "2024-05-01T09:30:00Z");

    let (status, _) = call(
        &state,
        "PUT",
        &uri,
        Some(ALICE),
        Some(json!({"reminder": "amanhã"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, task) = call(&state, "DELETE", &uri, Some(ALICE), None).await;
    assert_eq!(task["reminder"], Value::Null);

    let (_, task) = call(&state, "POST", &format!("/api/tasks/{}/toggle", id), Some(ALICE), None).await;
    assert_eq!(task["completed"], true);

    let (status, _) = call(&state, "DELETE", &format!("/api/tasks/{}", id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_goal_progress_is_clamped() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (_, body) = call(
        &state,
        "POST",
        "/api/goals",
        Some(ALICE),
        Some(json!({"description": "Ler", "target": 0})),
    )
    .await;
    assert_eq!(body["created"], false);

    let (_, body) = call(
        &state,
        "POST",
        "/api/goals",
        Some(ALICE),
        Some(json!({"description": "Ler 3 capítulos", "target": 3})),
    )
    .await;
    let id = body["item"]["id"].as_str().unwrap().to_string();

    let (_, goal) = call(
        &state,
        "PUT",
        &format!("/api/goals/{}", id),
        Some(ALICE),
        Some(json!({"current": 10})),
    )
    .await;
    assert_eq!(goal["current"], 3);

    let (_, goal) = call(
        &state,
        "PUT",
        &format!("/api/goals/{}", id),
        Some(ALICE),
        Some(json!({"current": -1})),
    )
    .await;
    assert_eq!(goal["current"], 0);
}

// =============================================================================
// Dashboard and back office
// =============================================================================

#[tokio::test]
async fn test_dashboard_gates_widgets() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;

    let (status, dash) = call(&state, "GET", "/api/dashboard", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["layout"]["main"][0]["widget"], "currentStatus");
    assert_eq!(dash["layout"]["main"][0]["state"], "visible");
    assert_eq!(dash["layout"]["main"][1]["state"], "locked");
    assert_eq!(dash["nextChapter"]["chapter"]["id"], 0);
    assert_eq!(dash["badges"].as_array().unwrap().len(), 3);
    assert_eq!(dash["banner"], Value::Null);
}

#[tokio::test]
async fn test_back_office_requires_staff() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;
    sign_in(&state, ADMIN).await;

    let (status, _) = call(&state, "GET", "/api/admin/students", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, students) = call(&state, "GET", "/api/admin/students", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    let students = students.as_array().unwrap();
    assert_eq!(students.len(), 1, "staff must not appear as students");
    assert_eq!(students[0]["email"], ALICE);
    assert_eq!(students[0]["progress"], 0);
}

#[tokio::test]
async fn test_admin_changes_student_tier_live() {
    let state = setup_state(true).await;
    let alice = sign_in(&state, ALICE).await;
    sign_in(&state, ADMIN).await;
    let id = alice["profile"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &state,
        "PUT",
        &format!("/api/admin/students/{}/tier", id),
        Some(ADMIN),
        Some(json!({"tier": "Complete"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "Complete");

    let (status, _) = call(&state, "GET", "/api/chapters/8", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_announcement_banner_and_notification() {
    let state = setup_state(true).await;
    sign_in(&state, ALICE).await;
    sign_in(&state, ADMIN).await;

    let (status, body) = call(
        &state,
        "PUT",
        "/api/admin/announcement",
        Some(ADMIN),
        Some(json!({"message": "Nova aula!", "displayType": "both"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let notification_id = body["notification"]["id"].as_str().unwrap().to_string();

    let (_, dash) = call(&state, "GET", "/api/dashboard", Some(ALICE), None).await;
    assert_eq!(dash["banner"]["message"], "Nova aula!");

    let (_, reminders) = call(&state, "GET", "/api/reminders", Some(ALICE), None).await;
    assert_eq!(reminders["notifications"][0]["message"], "Nova aula!");

    call(&state, "DELETE", "/api/announcement", Some(ALICE), None).await;
    call(
        &state,
        "DELETE",
        &format!("/api/notifications/{}", notification_id),
        Some(ALICE),
        None,
    )
    .await;
    let (_, dash) = call(&state, "GET", "/api/dashboard", Some(ALICE), None).await;
    assert_eq!(dash["banner"], Value::Null);
    let (_, reminders) = call(&state, "GET", "/api/reminders", Some(ALICE), None).await;
    assert_eq!(reminders["notifications"], json!([]));

    // publishing again re-shows the banner
    call(
        &state,
        "PUT",
        "/api/admin/announcement",
        Some(ADMIN),
        Some(json!({"message": "Outra", "displayType": "banner"})),
    )
    .await;
    let (_, dash) = call(&state, "GET", "/api/dashboard", Some(ALICE), None).await;
    assert_eq!(dash["banner"]["message"], "Outra");
}

#[tokio::test]
async fn test_chapter_administration() {
    let state = setup_state(true).await;
    sign_in(&state, ADMIN).await;

    let (status, body) = call(
        &state,
        "POST",
        "/api/admin/chapters",
        Some(ADMIN),
        Some(json!({"title": "Bônus", "shortTitle": "Bônus", "tier": "Free", "icon": "Sparkles"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 12);

    let mut order: Vec<u32> = (0..=12).rev().collect();
    let (status, chapters) = call(
        &state,
        "PUT",
        "/api/admin/chapters/order",
        Some(ADMIN),
        Some(json!({"order": order})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chapters[0]["id"], 12);

    order.pop();
    let (status, _) = call(
        &state,
        "PUT",
        "/api/admin/chapters/order",
        Some(ADMIN),
        Some(json!({"order": order})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &state,
        "PUT",
        "/api/admin/chapters/77",
        Some(ADMIN),
        Some(json!({"title": "X", "shortTitle": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_social_switch_hides_friends_widget() {
    let state = setup_state(true).await;
    sign_in(&state, ADMIN).await;

    let (status, _) = call(
        &state,
        "PUT",
        "/api/admin/settings",
        Some(ADMIN),
        Some(json!({"socialModuleEnabled": false, "maintenanceMode": false, "newSignups": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, dash) = call(&state, "GET", "/api/dashboard", Some(ADMIN), None).await;
    let sidebar = dash["layout"]["sidebar"].as_array().unwrap();
    assert!(sidebar.iter().all(|w| w["widget"] != "friends"));
}

#[tokio::test]
async fn test_staff_management_is_admin_only() {
    let state = setup_state(true).await;
    sign_in(&state, ADMIN).await;

    let (status, prof) = call(
        &state,
        "POST",
        "/api/admin/staff",
        Some(ADMIN),
        Some(json!({"name": "Prof", "email": "prof@example.com", "role": "Professor"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(prof["tier"], "Complete");

    sign_in(&state, "prof@example.com").await;
    let (status, _) = call(&state, "GET", "/api/admin/staff", Some("prof@example.com"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // professors still reach the back office
    let (status, _) = call(&state, "GET", "/api/admin/chapters", Some("prof@example.com"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, staff) = call(&state, "GET", "/api/admin/staff", Some(ADMIN), None).await;
    assert_eq!(staff.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_announcement_extends_bell() {
    let reminders = ReminderConfig {
        ring_duration_ms: 400,
        ..ReminderConfig::default()
    };
    let state = setup_state_with(true, reminders).await;
    sign_in(&state, ALICE).await;
    sign_in(&state, ADMIN).await;
    let announce = |message: &str| json!({"message": message, "displayType": "notification"});

    call(&state, "PUT", "/api/admin/announcement", Some(ADMIN), Some(announce("Primeira"))).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    call(&state, "PUT", "/api/admin/announcement", Some(ADMIN), Some(announce("Segunda"))).await;

    // past the first ring's window, inside the second's
    tokio::time::sleep(Duration::from_millis(250)).await;
    let (_, reminders) = call(&state, "GET", "/api/reminders", Some(ALICE), None).await;
    assert_eq!(reminders["ringing"], true);
    assert_eq!(reminders["notifications"][0]["message"], "Segunda");

    tokio::time::sleep(Duration::from_millis(300)).await;
    let (_, reminders) = call(&state, "GET", "/api/reminders", Some(ALICE), None).await;
    assert_eq!(reminders["ringing"], false);
}

#[tokio::test]
async fn test_email_change_keeps_unsaved_profile_changes() {
    let state = setup_state(true).await;
    let alice = sign_in(&state, ALICE).await;
    sign_in(&state, ADMIN).await;
    let id = alice["profile"]["id"].as_str().unwrap().to_string();

    sqlx::query(
        "CREATE TRIGGER hold_profiles BEFORE UPDATE ON profiles \
         BEGIN SELECT RAISE(ABORT, 'profiles locked'); END",
    )
    .execute(&state.db)
    .await
    .unwrap();

    // applied in memory, left dirty
    let (status, body) = call(
        &state,
        "PUT",
        &format!("/api/admin/students/{}/tier", id),
        Some(ADMIN),
        Some(json!({"tier": "Complete"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "Complete");
    let session = state.sessions.get(ALICE).await.unwrap();
    assert_eq!(session.dirty_count().await, 1);
    drop(session);

    sqlx::query("DROP TRIGGER hold_profiles")
        .execute(&state.db)
        .await
        .unwrap();

    let (status, body) = call(
        &state,
        "PUT",
        &format!("/api/admin/students/{}", id),
        Some(ADMIN),
        Some(json!({"name": "Alice", "email": "alice.new@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice.new@example.com");
    assert_eq!(body["tier"], "Complete");
    assert!(state.sessions.get(ALICE).await.is_none());

    let stored = find_profile(&state.db, &id).await.unwrap().unwrap();
    assert_eq!(stored.tier, Tier::Complete);
    assert_eq!(stored.email, "alice.new@example.com");
}

#[tokio::test]
async fn test_layout_with_repeated_widget_is_rejected() {
    let state = setup_state(true).await;
    sign_in(&state, ADMIN).await;

    let (status, body) = call(
        &state,
        "PUT",
        "/api/admin/layout",
        Some(ADMIN),
        Some(json!({"main": ["tasks"], "sidebar": ["tasks"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_stored_layout_with_repeated_widget_falls_back() {
    let pool = init_memory_database().await.unwrap();
    set_json(
        &pool,
        keys::DASHBOARD_LAYOUT,
        &json!({"main": ["tasks"], "sidebar": ["tasks"]}),
    )
    .await
    .unwrap();

    let state = AppState::load(
        pool,
        builtin::default_library(),
        ReminderConfig::default(),
        PersistenceConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(state.course.read().await.layout, DashboardLayout::default());
}

/// Test helper: next SSE frame as text
async fn next_frame<S>(body: &mut S) -> String
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("SSE frame should arrive")
        .expect("SSE stream should stay open")
        .unwrap();
    String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn test_event_stream_carries_only_own_events() {
    let state = setup_state(true).await;
    let alice = sign_in(&state, ALICE).await;
    let bob = sign_in(&state, "bob@example.com").await;
    let alice_id = alice["profile"]["id"].as_str().unwrap().to_string();
    let bob_id = bob["profile"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&state, "GET", "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/events")
        .header("x-user-email", ALICE)
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    let mut body = Box::pin(response.into_body().into_data_stream());

    let first = next_frame(&mut body).await;
    assert!(first.contains("event: ConnectionStatus"));
    assert!(first.contains("data: connected"));

    // bob completes first; alice's stream must skip it
    let complete = json!({"value": true});
    call(&state, "PUT", "/api/answers/c0_commitment", Some("bob@example.com"), Some(complete.clone())).await;
    call(&state, "PUT", "/api/answers/c0_commitment", Some(ALICE), Some(complete)).await;

    let frame = next_frame(&mut body).await;
    assert!(frame.contains("event: ChapterCompleted"));
    assert!(frame.contains(&alice_id));
    assert!(!frame.contains(&bob_id));
}
