//! JSON values in the `settings` table
//!
//! Global configuration (chapter catalog, widget layout, admin switches,
//! announcement) is stored as one JSON document per key. A value that fails to
//! decode is logged and replaced by the caller's default; it is never fatal.

use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Settings keys used by the course service
pub mod keys {
    pub const CHAPTER_CONFIGS: &str = "chapter_configs";
    pub const DASHBOARD_LAYOUT: &str = "dashboard_layout";
    pub const WIDGET_TIERS: &str = "widget_tiers";
    pub const ADMIN_SETTINGS: &str = "admin_settings";
    pub const ANNOUNCEMENT: &str = "announcement";
}

/// Read and decode `key`, falling back to `default` when absent or malformed
pub async fn get_json<T: DeserializeOwned>(pool: &SqlitePool, key: &str, default: T) -> Result<T> {
    let raw: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    let Some(Some(raw)) = raw else {
        return Ok(default);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(key, error = %e, "Malformed setting value, using default");
            Ok(default)
        }
    }
}

/// Encode and upsert `value` under `key`
pub async fn set_json<T: Serialize + ?Sized>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value)?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(encoded)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove `key`; later reads see the default
pub async fn delete(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Write `default` only when `key` is missing or NULL
pub(crate) async fn ensure_json<T: Serialize + ?Sized>(
    pool: &SqlitePool,
    key: &str,
    default: &T,
) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM settings WHERE key = ? AND value IS NOT NULL)",
    )
    .bind(key)
    .fetch_one(pool)
    .await?;

    if !exists {
        set_json(pool, key, default).await?;
        info!("Initialized setting '{}' with default", key);
    }

    Ok(())
}
