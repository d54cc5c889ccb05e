use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::db::{self, QueueCounts, QueueEntry};
use crate::error::AppError;
use crate::lifecycle::{
    self, QueueTab, Recommendation, Status, StatusLabel, TransitionError,
};
use crate::notify::{EmailKind, OutboundEmail};
use crate::ratings::{self, ScreeningSort};
use crate::state::AppState;

fn require_editor(auth: &AuthContext) -> Result<(), AppError> {
    if auth.role.is_editor() {
        Ok(())
    } else {
        Err(TransitionError::NotEditor.into())
    }
}

#[derive(Deserialize)]
pub struct QueueQuery {
    tab: Option<String>,
    sort: Option<String>,
}

/// Queue row plus the editor-facing status label.
#[derive(Serialize)]
pub struct QueueItem {
    #[serde(flatten)]
    entry: QueueEntry,
    status_label: StatusLabel,
}

pub async fn screening_queue(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<QueueItem>>, AppError> {
    require_editor(&auth)?;

    let tab = QueueTab::parse(query.tab.as_deref().unwrap_or("pending"));
    let sort = ScreeningSort::parse(query.sort.as_deref().unwrap_or("newest"));

    let mut entries = db::screening_queue(
        state.pool.as_ref(),
        tab.statuses(),
        sort == ScreeningSort::Oldest,
    )
    .await?;

    // Rated sorts merge the pool aggregates in and order in code; pending
    // submissions have no ratings and keep their zero stats.
    if matches!(sort, ScreeningSort::HighestRated | ScreeningSort::MostRated) {
        let stats: HashMap<Uuid, (f64, i64)> = db::rating_stats(state.pool.as_ref())
            .await?
            .into_iter()
            .map(|(id, weighted, count)| (id, (weighted, count)))
            .collect();
        for entry in &mut entries {
            if let Some(&(weighted, count)) = stats.get(&entry.id) {
                entry.weighted_score = weighted;
                entry.rating_count = count;
            }
        }
        let cmp = match sort {
            ScreeningSort::HighestRated => ratings::cmp_highest_rated,
            _ => ratings::cmp_most_rated,
        };
        entries.sort_by(|a, b| {
            cmp(
                (a.weighted_score, a.rating_count),
                (b.weighted_score, b.rating_count),
            )
        });
    }

    let items = entries
        .into_iter()
        .map(|entry| {
            let status_label = Status::parse(&entry.status)
                .unwrap_or(Status::Pending)
                .editor_label();
            QueueItem {
                entry,
                status_label,
            }
        })
        .collect();

    Ok(Json(items))
}

pub async fn queue_counts(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<QueueCounts>, AppError> {
    require_editor(&auth)?;
    let counts = db::queue_counts(state.pool.as_ref()).await?;
    Ok(Json(counts))
}

#[derive(Deserialize)]
pub struct DecisionForm {
    decision: String,
    notes: Option<String>,
    solicited_topic: Option<String>,
}

pub async fn screening_decision(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(form): Json<DecisionForm>,
) -> Result<Json<Value>, AppError> {
    let target = Status::parse(&form.decision).ok_or_else(|| {
        AppError::validation("decision", format!("Unknown decision \"{}\"", form.decision))
    })?;

    let submission = db::get_submission(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Submission"))?;
    let current = Status::parse(&submission.status).unwrap_or(Status::Pending);

    lifecycle::check_decision(auth.role, current, target)?;

    let notes = form
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let topic = form
        .solicited_topic
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let updated = db::apply_decision(
        state.pool.as_ref(),
        id,
        current,
        target,
        auth.user_id,
        notes,
        topic,
    )
    .await?;
    if !updated {
        return Err(AppError::Conflict(
            "Submission was decided concurrently; reload and retry".to_string(),
        ));
    }

    // The email is an afterthought of the transition: emitted only once the
    // row moved, and its delivery never affects this response.
    if lifecycle::decision_notifies(target) {
        state.notifier.send(OutboundEmail {
            email: submission.email.clone(),
            author_name: submission.author_name.clone(),
            manuscript_title: submission.manuscript_title.clone(),
            submission_id: id,
            kind: EmailKind::Decision {
                decision: target,
                notes: notes.map(String::from),
            },
        });
    }

    info!(
        "Submission {id} screened {} -> {} by {}",
        current.as_str(),
        target.as_str(),
        auth.user_id
    );
    Ok(Json(json!({
        "id": id,
        "status": target.as_str(),
    })))
}

fn default_completed() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ReviewForm {
    recommendation: String,
    comments_to_author: Option<String>,
    stink_score: Option<i16>,
    #[serde(default = "default_completed")]
    completed: bool,
}

pub async fn post_review(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<Value>, AppError> {
    if !auth.role.can_review() {
        return Err(AppError::Forbidden(
            "Reviewer role required / 需要评审权限".to_string(),
        ));
    }

    let recommendation = Recommendation::parse(&form.recommendation).ok_or_else(|| {
        AppError::validation(
            "recommendation",
            format!("Unknown recommendation \"{}\"", form.recommendation),
        )
    })?;
    if let Some(score) = form.stink_score {
        if !(1..=10).contains(&score) {
            return Err(AppError::validation(
                "stink_score",
                "Stink score must be between 1 and 10",
            ));
        }
    }

    db::get_submission(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Submission"))?;

    db::insert_review(
        state.pool.as_ref(),
        id,
        auth.user_id,
        recommendation.as_str(),
        form.comments_to_author.as_deref(),
        form.stink_score,
        form.completed,
    )
    .await?;

    Ok(Json(json!({ "ok": true })))
}
