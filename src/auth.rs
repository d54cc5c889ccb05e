//! Actor identity and role.
//!
//! Identity verification is delegated to the fronting auth layer, which
//! forwards the authenticated user's id and email as `x-user-id` /
//! `x-user-email`. The extractors resolve the stored profile role so every
//! handler receives an explicit actor context instead of reaching into
//! ambient state.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Reviewer,
    Editor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "author" => Some(Role::Author),
            "reviewer" => Some(Role::Reviewer),
            "editor" => Some(Role::Editor),
            _ => None,
        }
    }

    pub fn is_editor(self) -> bool {
        self == Role::Editor
    }

    pub fn can_review(self) -> bool {
        matches!(self, Role::Reviewer | Role::Editor)
    }
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(AppError::Unauthorized)?;

        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        // Users without a profile row act as plain authors.
        let role = db::get_profile(state.pool.as_ref(), user_id)
            .await?
            .and_then(|p| Role::parse(&p.role))
            .unwrap_or(Role::Author);

        Ok(AuthContext {
            user_id,
            email,
            role,
        })
    }
}

/// Anonymous-friendly variant for public routes.
pub struct OptionalAuth(pub Option<AuthContext>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await {
            Ok(ctx) => Ok(OptionalAuth(Some(ctx))),
            Err(AppError::Unauthorized) => Ok(OptionalAuth(None)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_round_trip() {
        for role in [Role::Author, Role::Reviewer, Role::Editor] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("janitor"), None);
    }

    #[test]
    fn reviewer_capabilities() {
        assert!(Role::Editor.is_editor());
        assert!(!Role::Reviewer.is_editor());
        assert!(Role::Reviewer.can_review());
        assert!(Role::Editor.can_review());
        assert!(!Role::Author.can_review());
    }
}
