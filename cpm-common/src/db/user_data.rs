//! Profiles and per-user records
//!
//! Each workspace mutation names the record it touched ([`RecordKey`]);
//! [`sync_record`] writes that record's current in-memory state, inserting or
//! updating it when it still exists and deleting it otherwise. Writing the
//! same state twice is harmless, which is what lets a failed write be retried
//! later from the dirty set.

use crate::content::{ChapterId, FormAnswers, FormValue};
use crate::workspace::{Note, RecordKey, Role, Task, UserProfile, UserWorkspace, WeeklyGoal};
use crate::{Result, Tier};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: String,
    name: String,
    email: String,
    avatar_url: String,
    tier: String,
    role: Option<String>,
    joined_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self) -> UserProfile {
        let tier = self.tier.parse().unwrap_or_else(|_| {
            warn!(user_id = %self.user_id, tier = %self.tier, "Unknown stored tier, using Free");
            Tier::Free
        });
        let role = self.role.as_deref().and_then(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                warn!(user_id = %self.user_id, role = r, "Unknown stored role, ignoring");
                None
            }
        });
        UserProfile {
            id: self.user_id,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
            tier,
            role,
            joined_at: self.joined_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct NoteRow {
    id: String,
    content: String,
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: String,
    text: String,
    completed: bool,
    reminder: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct GoalRow {
    id: String,
    description: String,
    target: i64,
    current: i64,
}

#[derive(Debug, FromRow)]
struct AnswerRow {
    key: String,
    value: String,
}

const PROFILE_COLUMNS: &str = "user_id, name, email, avatar_url, tier, role, joined_at";

fn parse_id(raw: &str, table: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(table, id = raw, error = %e, "Skipping row with malformed id");
            None
        }
    }
}

// ---- profiles ----

pub async fn find_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<UserProfile>> {
    let row: Option<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {} FROM profiles WHERE user_id = ?",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(ProfileRow::into_profile))
}

/// Case-insensitive lookup by e-mail
pub async fn find_profile_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserProfile>> {
    let row: Option<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {} FROM profiles WHERE lower(email) = lower(?)",
        PROFILE_COLUMNS
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(ProfileRow::into_profile))
}

/// Students (`staff = false`) or staff members, oldest account first
pub async fn list_profiles(pool: &SqlitePool, staff: bool) -> Result<Vec<UserProfile>> {
    let filter = if staff {
        "role IS NOT NULL"
    } else {
        "role IS NULL"
    };
    let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {} FROM profiles WHERE {} ORDER BY joined_at ASC, rowid ASC",
        PROFILE_COLUMNS, filter
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ProfileRow::into_profile).collect())
}

pub async fn upsert_profile(pool: &SqlitePool, profile: &UserProfile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, name, email, avatar_url, tier, role, joined_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            avatar_url = excluded.avatar_url,
            tier = excluded.tier,
            role = excluded.role,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&profile.id)
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.avatar_url)
    .bind(profile.tier.as_str())
    .bind(profile.role.map(Role::as_str))
    .bind(profile.joined_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove the profile and every record owned by it; returns whether it existed
pub async fn delete_user(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    for table in [
        "user_notes",
        "user_tasks",
        "user_weekly_goals",
        "user_form_data",
        "user_favorite_chapters",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE user_id = ?", table))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let deleted = sqlx::query("DELETE FROM profiles WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    if deleted > 0 {
        info!(user_id, "Deleted user and all owned records");
    }
    Ok(deleted > 0)
}

// ---- workspace ----

/// Stored form answers for one user; undecodable values are skipped
pub async fn load_answers(pool: &SqlitePool, user_id: &str) -> Result<FormAnswers> {
    let rows: Vec<AnswerRow> =
        sqlx::query_as("SELECT key, value FROM user_form_data WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let mut answers = FormAnswers::new();
    for row in rows {
        match serde_json::from_str::<FormValue>(&row.value) {
            Ok(value) => {
                answers.insert(row.key, value);
            }
            Err(e) => warn!(user_id, key = %row.key, error = %e, "Skipping malformed answer"),
        }
    }
    Ok(answers)
}

/// Restore a signed-in user's workspace; lists come back newest first
pub async fn load_workspace(pool: &SqlitePool, profile: UserProfile) -> Result<UserWorkspace> {
    let user_id = profile.id.clone();

    let notes: Vec<NoteRow> = sqlx::query_as(
        "SELECT id, content FROM user_notes WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(&user_id)
    .fetch_all(pool)
    .await?;

    let tasks: Vec<TaskRow> = sqlx::query_as(
        "SELECT id, text, completed, reminder FROM user_tasks WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(&user_id)
    .fetch_all(pool)
    .await?;

    let goals: Vec<GoalRow> = sqlx::query_as(
        "SELECT id, description, target, current FROM user_weekly_goals WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(&user_id)
    .fetch_all(pool)
    .await?;

    let favorites: Vec<i64> =
        sqlx::query_scalar("SELECT chapter_id FROM user_favorite_chapters WHERE user_id = ?")
            .bind(&user_id)
            .fetch_all(pool)
            .await?;

    let answers = load_answers(pool, &user_id).await?;

    let notes = notes
        .into_iter()
        .filter_map(|row| {
            parse_id(&row.id, "user_notes").map(|id| Note {
                id,
                content: row.content,
            })
        })
        .collect::<Vec<_>>();

    let tasks = tasks
        .into_iter()
        .filter_map(|row| {
            parse_id(&row.id, "user_tasks").map(|id| Task {
                id,
                text: row.text,
                completed: row.completed,
                reminder: row.reminder,
            })
        })
        .collect::<Vec<_>>();

    let goals = goals
        .into_iter()
        .filter_map(|row| {
            let id = parse_id(&row.id, "user_weekly_goals")?;
            let target = u32::try_from(row.target).ok().filter(|t| *t > 0)?;
            let current = u32::try_from(row.current).unwrap_or(0).min(target);
            Some(WeeklyGoal {
                id,
                description: row.description,
                target,
                current,
            })
        })
        .collect::<Vec<_>>();

    let favorites = favorites
        .into_iter()
        .filter_map(|id| ChapterId::try_from(id).ok())
        .collect::<BTreeSet<_>>();

    debug!(
        user_id = %user_id,
        notes = notes.len(),
        tasks = tasks.len(),
        goals = goals.len(),
        favorites = favorites.len(),
        answers = answers.len(),
        "Loaded user workspace"
    );

    Ok(UserWorkspace::from_parts(
        profile, notes, tasks, goals, favorites, answers,
    ))
}

/// Write one record's current in-memory state
pub async fn sync_record(pool: &SqlitePool, workspace: &UserWorkspace, key: &RecordKey) -> Result<()> {
    let user_id = workspace.user_id();

    match key {
        RecordKey::Profile => upsert_profile(pool, workspace.profile()).await?,

        RecordKey::Note(id) => match workspace.note(*id) {
            Some(note) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_notes (id, user_id, content) VALUES (?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET content = excluded.content
                    "#,
                )
                .bind(id.to_string())
                .bind(user_id)
                .bind(&note.content)
                .execute(pool)
                .await?;
            }
            None => delete_owned(pool, "user_notes", user_id, *id).await?,
        },

        RecordKey::Task(id) => match workspace.task(*id) {
            Some(task) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_tasks (id, user_id, text, completed, reminder) VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        text = excluded.text,
                        completed = excluded.completed,
                        reminder = excluded.reminder
                    "#,
                )
                .bind(id.to_string())
                .bind(user_id)
                .bind(&task.text)
                .bind(task.completed)
                .bind(task.reminder)
                .execute(pool)
                .await?;
            }
            None => delete_owned(pool, "user_tasks", user_id, *id).await?,
        },

        RecordKey::Goal(id) => match workspace.goal(*id) {
            Some(goal) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_weekly_goals (id, user_id, description, target, current) VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        description = excluded.description,
                        target = excluded.target,
                        current = excluded.current
                    "#,
                )
                .bind(id.to_string())
                .bind(user_id)
                .bind(&goal.description)
                .bind(i64::from(goal.target))
                .bind(i64::from(goal.current))
                .execute(pool)
                .await?;
            }
            None => delete_owned(pool, "user_weekly_goals", user_id, *id).await?,
        },

        RecordKey::Favorite(chapter_id) => {
            if workspace.favorites().contains(chapter_id) {
                sqlx::query(
                    "INSERT OR IGNORE INTO user_favorite_chapters (user_id, chapter_id) VALUES (?, ?)",
                )
                .bind(user_id)
                .bind(i64::from(*chapter_id))
                .execute(pool)
                .await?;
            } else {
                sqlx::query(
                    "DELETE FROM user_favorite_chapters WHERE user_id = ? AND chapter_id = ?",
                )
                .bind(user_id)
                .bind(i64::from(*chapter_id))
                .execute(pool)
                .await?;
            }
        }

        RecordKey::Answer(answer_key) => match workspace.answers().get(answer_key) {
            Some(value) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_form_data (user_id, key, value) VALUES (?, ?, ?)
                    ON CONFLICT(user_id, key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = CURRENT_TIMESTAMP
                    "#,
                )
                .bind(user_id)
                .bind(answer_key)
                .bind(serde_json::to_string(value)?)
                .execute(pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM user_form_data WHERE user_id = ? AND key = ?")
                    .bind(user_id)
                    .bind(answer_key)
                    .execute(pool)
                    .await?;
            }
        },
    }

    Ok(())
}

async fn delete_owned(pool: &SqlitePool, table: &str, user_id: &str, id: Uuid) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ? AND user_id = ?", table))
        .bind(id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
