//! Caller identity supplied by the upstream authentication provider
//!
//! The provider forwards `x-user-email` on every request, plus `x-user-id`
//! and `x-user-name` when known. Sessions are keyed by the normalized e-mail.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    /// Trimmed and lowercased
    pub email: String,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(email: &str) -> Self {
        Self {
            user_id: None,
            email: normalize_email(email),
            name: None,
        }
    }

    /// Display name, falling back to the e-mail's local part
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .email
                .split('@')
                .next()
                .unwrap_or(&self.email)
                .to_string(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = header(parts, USER_EMAIL_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing x-user-email header".to_string()))?;

        if !email.contains('@') {
            return Err(ApiError::Unauthorized(format!("Invalid e-mail: {}", email)));
        }

        Ok(Identity {
            user_id: header(parts, USER_ID_HEADER),
            email: normalize_email(&email),
            name: header(parts, USER_NAME_HEADER),
        })
    }
}
