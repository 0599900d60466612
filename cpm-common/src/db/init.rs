//! Database initialization
//!
//! Creates the database file on first run, enables foreign keys and WAL, and
//! creates every table with `CREATE TABLE IF NOT EXISTS` so initialization is
//! idempotent. Global configuration defaults are seeded into `settings`.

use crate::content::builtin;
use crate::dashboard::{AdminSettings, DashboardLayout, WidgetTiers};
use crate::db::kv::{self, keys};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and initialize the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with the full schema
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and seed default settings
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_settings_table(pool).await?;
    create_profiles_table(pool).await?;
    create_user_notes_table(pool).await?;
    create_user_tasks_table(pool).await?;
    create_user_weekly_goals_table(pool).await?;
    create_user_form_data_table(pool).await?;
    create_user_favorite_chapters_table(pool).await?;

    init_default_settings(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            avatar_url TEXT NOT NULL DEFAULT '',
            tier TEXT NOT NULL DEFAULT 'Free',
            role TEXT,
            joined_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_notes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_notes_user ON user_notes(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_user_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            reminder TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_tasks_user ON user_tasks(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_user_weekly_goals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_weekly_goals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            target INTEGER NOT NULL CHECK (target > 0),
            current INTEGER NOT NULL DEFAULT 0 CHECK (current >= 0 AND current <= target),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_form_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_form_data (
            user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_favorite_chapters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_favorite_chapters (
            user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
            chapter_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, chapter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed global configuration that does not exist yet
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    kv::ensure_json(pool, keys::CHAPTER_CONFIGS, &builtin::default_catalog()).await?;
    kv::ensure_json(pool, keys::DASHBOARD_LAYOUT, &DashboardLayout::default()).await?;
    kv::ensure_json(pool, keys::WIDGET_TIERS, &WidgetTiers::default()).await?;
    kv::ensure_json(pool, keys::ADMIN_SETTINGS, &AdminSettings::default()).await?;
    Ok(())
}
