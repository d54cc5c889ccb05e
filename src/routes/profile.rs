use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AuthContext, Role};
use crate::db::{self, Profile};
use crate::error::AppError;
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Profile>, AppError> {
    if let Some(profile) = db::get_profile(state.pool.as_ref(), auth.user_id).await? {
        return Ok(Json(profile));
    }

    // No stored profile yet: a plain-author placeholder named after the
    // email's local part.
    let display_name = auth
        .email
        .split('@')
        .next()
        .unwrap_or("author")
        .to_string();
    Ok(Json(Profile {
        id: auth.user_id,
        display_name,
        institution: None,
        social_media: None,
        role: Role::Author.as_str().to_string(),
        created_at: Utc::now(),
    }))
}

#[derive(Deserialize)]
pub struct ProfileForm {
    display_name: String,
    institution: Option<String>,
    social_media: Option<String>,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>, AppError> {
    if form.display_name.trim().is_empty() {
        return Err(AppError::validation(
            "display_name",
            "Display name is required / 昵称不能为空",
        ));
    }

    let profile = db::upsert_profile(
        state.pool.as_ref(),
        auth.user_id,
        form.display_name.trim(),
        form.institution.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        form.social_media.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    )
    .await?;

    Ok(Json(profile))
}
