//! HTTP API handlers for cpm-ui

pub mod admin;
pub mod course;
pub mod dashboard;
pub mod health;
pub mod session;
pub mod sse;
pub mod workspace;

pub use health::health_routes;

use serde::Serialize;

/// Response for adds that silently ignore invalid input
#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

impl<T> Created<T> {
    pub fn from_option(item: Option<T>) -> Self {
        Self {
            created: item.is_some(),
            item,
        }
    }
}
