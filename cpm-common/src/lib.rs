//! # CPM Common Library
//!
//! Course logic shared by the Chaotic Productivity Method services:
//! - Tier gating (Free < Essential < Complete)
//! - Chapter catalog, completion tracking and next-chapter selection
//! - Plain-text content search with locking metadata
//! - Reminder scheduling for user tasks
//! - Dashboard layout, badges and stats
//! - Per-user workspace (notes, tasks, goals, favorites, form answers)
//! - Event bus, configuration loading and SQLite persistence

pub mod config;
pub mod content;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod events;
pub mod icons;
pub mod reminders;
pub mod tier;
pub mod time;
pub mod workspace;

pub use error::{Error, Result};
pub use tier::{has_access, Tier};
