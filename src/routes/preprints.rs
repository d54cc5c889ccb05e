use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthContext, OptionalAuth};
use crate::db::{self, Preprint};
use crate::error::AppError;
use crate::lifecycle::Viscosity;
use crate::ratings::{self, PreprintSort};
use crate::state::AppState;

pub const PAGE_SIZE: i64 = 10;

#[derive(Deserialize)]
pub struct PoolQuery {
    sort: Option<String>,
    topic: Option<String>,
    page: Option<i64>,
}

#[derive(Serialize)]
pub struct PoolPage {
    pub preprints: Vec<Preprint>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list_preprints(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PoolQuery>,
) -> Result<Json<PoolPage>, AppError> {
    let sort = PreprintSort::parse(query.sort.as_deref().unwrap_or(""));
    let topic = query
        .topic
        .as_deref()
        .filter(|t| !t.is_empty() && *t != "all");
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let preprints =
        db::list_preprints(state.pool.as_ref(), sort, topic, PAGE_SIZE, offset).await?;
    let total_count = db::count_preprints(state.pool.as_ref(), topic).await?;

    Ok(Json(PoolPage {
        preprints,
        total_count,
        page,
        page_size: PAGE_SIZE,
    }))
}

#[derive(Serialize)]
pub struct PreprintDetail {
    #[serde(flatten)]
    preprint: Preprint,
    viscosity_label: Option<&'static str>,
    /// The caller's own score, when authenticated and previously rated.
    your_score: Option<i16>,
}

pub async fn get_preprint(
    State(state): State<Arc<AppState>>,
    auth: OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<PreprintDetail>, AppError> {
    // The view only carries pool-visible submissions, so everything else is
    // a 404 here by construction.
    let preprint = db::get_preprint(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Preprint"))?;

    let your_score = match &auth.0 {
        Some(actor) => db::get_user_rating(state.pool.as_ref(), actor.user_id, id).await?,
        None => None,
    };

    let viscosity_label = Viscosity::parse(&preprint.viscosity).map(Viscosity::label);

    Ok(Json(PreprintDetail {
        preprint,
        viscosity_label,
        your_score,
    }))
}

#[derive(Deserialize)]
pub struct RatingForm {
    score: i16,
}

/// Upserts the caller's rating and answers with fresh aggregates.
pub async fn rate_preprint(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(form): Json<RatingForm>,
) -> Result<Json<Value>, AppError> {
    if !ratings::score_in_range(form.score) {
        return Err(AppError::validation(
            "score",
            "Score must be between 1 and 5 / 评分需在1到5之间",
        ));
    }

    let preprint = db::get_preprint(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Preprint"))?;

    // The database trigger rejects this too; checking here gives the caller
    // a readable refusal instead of a storage error.
    if preprint.user_id == Some(auth.user_id) {
        return Err(AppError::Forbidden(
            "You cannot rate your own submission / 不能评价自己的稿件".to_string(),
        ));
    }

    db::upsert_rating(state.pool.as_ref(), auth.user_id, id, form.score).await?;

    let aggregates = db::preprint_aggregates(state.pool.as_ref(), id)
        .await?
        .unwrap_or_default();

    Ok(Json(json!({
        "avg_score": aggregates.avg_score,
        "rating_count": aggregates.rating_count,
        "your_score": form.score,
    })))
}
