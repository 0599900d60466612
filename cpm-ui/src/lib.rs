//! cpm-ui library - course service for the Chaotic Productivity Method
//!
//! HTTP API over `cpm-common`: sessions with per-user reminder timers,
//! tier-gated chapters and search, personal workspace records, the dashboard
//! and the staff back office.

use axum::Router;
use cpm_common::config::{PersistenceConfig, ReminderConfig};
use cpm_common::content::{builtin, CompletionRequirements, ContentLibrary, CourseCatalog};
use cpm_common::dashboard::{AdminSettings, DashboardLayout, WidgetTiers};
use cpm_common::db::kv::{self, keys};
use cpm_common::db::{get_json, retry_with_backoff};
use cpm_common::events::EventBus;
use cpm_common::workspace::{Announcement, GlobalNotification};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

pub mod accounts;
pub mod api;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod session;

pub use error::{ApiError, ApiResult};

use identity::Identity;
use persistence::Persister;
use session::{Session, SessionRegistry};

/// Event bus capacity
const EVENT_CAPACITY: usize = 256;

/// Global notifications kept in memory; older ones are dropped
pub const MAX_NOTIFICATIONS: usize = 20;

/// Global course configuration, cached in memory and written through to `settings`
#[derive(Debug, Clone)]
pub struct CourseConfig {
    pub catalog: CourseCatalog,
    pub layout: DashboardLayout,
    pub widget_tiers: WidgetTiers,
    pub admin: AdminSettings,
    pub announcement: Option<Announcement>,
    /// Pushed by announcements, newest first; not persisted
    pub notifications: Vec<GlobalNotification>,
}

impl CourseConfig {
    pub async fn load(db: &SqlitePool) -> cpm_common::Result<Self> {
        Ok(Self {
            catalog: get_json(db, keys::CHAPTER_CONFIGS, builtin::default_catalog()).await?,
            layout: get_json(db, keys::DASHBOARD_LAYOUT, DashboardLayout::default()).await?,
            widget_tiers: get_json(db, keys::WIDGET_TIERS, WidgetTiers::default()).await?,
            admin: get_json(db, keys::ADMIN_SETTINGS, AdminSettings::default()).await?,
            announcement: get_json(db, keys::ANNOUNCEMENT, None).await?,
            notifications: Vec::new(),
        })
    }

    /// Add a notification at the front, dropping the oldest beyond the cap
    ///
    /// Returns the ids still listed.
    pub fn push_notification(&mut self, notification: GlobalNotification) -> HashSet<Uuid> {
        self.notifications.insert(0, notification);
        self.notifications.truncate(MAX_NOTIFICATIONS);
        self.notifications.iter().map(|n| n.id).collect()
    }
}

/// Bell rung for every user by announcements
///
/// Holds the ring generation in the upper bits and the ringing flag in bit 0,
/// so a timer from an earlier ring cannot silence a later one.
#[derive(Debug, Default)]
pub struct GlobalBell {
    state: AtomicU64,
}

impl GlobalBell {
    /// Start ringing; returns the generation to pass to [`GlobalBell::release`]
    pub fn ring(&self) -> u64 {
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some((((v >> 1) + 1) << 1) | 1)
            })
            .unwrap_or_else(|v| v);
        (previous >> 1) + 1
    }

    /// Stop ringing unless a later ring started; returns whether it stopped
    pub fn release(&self, generation: u64) -> bool {
        let ringing = (generation << 1) | 1;
        self.state
            .compare_exchange(ringing, generation << 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_ringing(&self) -> bool {
        self.state.load(Ordering::Acquire) & 1 == 1
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub bus: EventBus,
    pub course: Arc<RwLock<CourseConfig>>,
    pub content: Arc<ContentLibrary>,
    pub requirements: Arc<CompletionRequirements>,
    pub sessions: SessionRegistry,
    pub persister: Persister,
    pub reminders: ReminderConfig,
    /// Parent of every session's reminder token
    pub shutdown: CancellationToken,
    /// Rung for every user by notification announcements
    pub global_bell: Arc<GlobalBell>,
}

impl AppState {
    /// Create state from an initialized database
    pub async fn load(
        db: SqlitePool,
        content: ContentLibrary,
        reminders: ReminderConfig,
        persistence: PersistenceConfig,
    ) -> cpm_common::Result<Self> {
        let course = CourseConfig::load(&db).await?;
        Ok(Self {
            persister: Persister::new(db.clone(), persistence),
            db,
            bus: EventBus::new(EVENT_CAPACITY),
            course: Arc::new(RwLock::new(course)),
            content: Arc::new(content),
            requirements: Arc::new(builtin::default_requirements()),
            sessions: SessionRegistry::new(),
            reminders,
            shutdown: CancellationToken::new(),
            global_bell: Arc::new(GlobalBell::default()),
        })
    }

    /// Session of the calling user
    pub async fn session(&self, identity: &Identity) -> ApiResult<Arc<Session>> {
        self.sessions
            .get(&identity.email)
            .await
            .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))
    }

    /// Write a global setting; failures are logged, never returned
    pub async fn save_setting<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let policy = self.persister.policy();
        let result = retry_with_backoff("save setting", policy, || kv::set_json(&self.db, key, value)).await;
        if let Err(e) = result {
            warn!(key, error = %e, "Setting not persisted");
        }
    }

    /// Remove a global setting; failures are logged, never returned
    pub async fn clear_setting(&self, key: &str) {
        let policy = self.persister.policy();
        let result = retry_with_backoff("clear setting", policy, || kv::delete(&self.db, key)).await;
        if let Err(e) = result {
            warn!(key, error = %e, "Setting not cleared");
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post, put};

    let user = Router::new()
        .route(
            "/api/session",
            get(api::session::current_session)
                .post(api::session::sign_in)
                .delete(api::session::sign_out),
        )
        .route("/api/account", delete(api::session::delete_account))
        .route("/api/profile", put(api::session::update_profile))
        .route("/api/tier", post(api::session::change_tier))
        .route("/api/chapters", get(api::course::list_chapters))
        .route("/api/chapters/:id", get(api::course::get_chapter))
        .route("/api/progress", get(api::course::get_progress))
        .route("/api/next-chapter", get(api::course::get_next_chapter))
        .route("/api/search", get(api::course::search_content))
        .route("/api/answers", get(api::course::list_answers))
        .route("/api/answers/:key", put(api::course::set_answer))
        .route("/api/favorites/:chapter_id", post(api::course::toggle_favorite))
        .route(
            "/api/notes",
            get(api::workspace::list_notes).post(api::workspace::add_note),
        )
        .route(
            "/api/notes/:id",
            put(api::workspace::edit_note).delete(api::workspace::delete_note),
        )
        .route(
            "/api/tasks",
            get(api::workspace::list_tasks).post(api::workspace::add_task),
        )
        .route("/api/tasks/:id", delete(api::workspace::delete_task))
        .route("/api/tasks/:id/toggle", post(api::workspace::toggle_task))
        .route(
            "/api/tasks/:id/reminder",
            put(api::workspace::set_reminder).delete(api::workspace::dismiss_reminder),
        )
        .route(
            "/api/goals",
            get(api::workspace::list_goals).post(api::workspace::add_goal),
        )
        .route(
            "/api/goals/:id",
            put(api::workspace::update_goal).delete(api::workspace::delete_goal),
        )
        .route("/api/dashboard", get(api::dashboard::get_dashboard))
        .route("/api/reminders", get(api::dashboard::get_reminders))
        .route(
            "/api/notifications/:id",
            delete(api::dashboard::dismiss_notification),
        )
        .route("/api/announcement", delete(api::dashboard::hide_banner))
        .route("/api/events", get(api::sse::event_stream));

    let admin = Router::new()
        .route(
            "/api/admin/settings",
            get(api::admin::get_settings).put(api::admin::update_settings),
        )
        .route(
            "/api/admin/announcement",
            put(api::admin::publish_announcement).delete(api::admin::clear_announcement),
        )
        .route(
            "/api/admin/chapters",
            get(api::admin::list_chapters).post(api::admin::add_chapter),
        )
        .route("/api/admin/chapters/order", put(api::admin::reorder_chapters))
        .route("/api/admin/chapters/:id", put(api::admin::update_chapter))
        .route(
            "/api/admin/layout",
            get(api::admin::get_layout).put(api::admin::update_layout),
        )
        .route("/api/admin/widgets/:id/tier", put(api::admin::set_widget_tier))
        .route(
            "/api/admin/students",
            get(api::admin::list_students).post(api::admin::add_student),
        )
        .route(
            "/api/admin/students/:id",
            put(api::admin::update_student).delete(api::admin::delete_student),
        )
        .route("/api/admin/students/:id/tier", put(api::admin::set_student_tier))
        .route(
            "/api/admin/staff",
            get(api::admin::list_staff).post(api::admin::add_staff),
        )
        .route(
            "/api/admin/staff/:id",
            put(api::admin::update_staff).delete(api::admin::delete_staff),
        );

    Router::new()
        .merge(user)
        .merge(admin)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
