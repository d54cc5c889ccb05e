use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoAuthor {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub institution: String,
    /// "co-first" or "other"
    #[serde(default = "default_contribution")]
    pub contribution: String,
}

fn default_contribution() -> String {
    "other".to_string()
}

#[derive(Debug, FromRow, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub manuscript_title: String,
    pub author_name: String,
    pub institution: String,
    pub social_media: Option<String>,
    pub co_authors: Json<Vec<CoAuthor>>,
    pub viscosity: String,
    pub file_path: String,
    pub file_name: String,
    pub pdf_path: Option<String>,
    pub file_size_bytes: i64,
    pub status: String,
    pub screening_notes: Option<String>,
    pub solicited_topic: Option<String>,
    pub screened_at: Option<DateTime<Utc>>,
    pub screened_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a fresh submission.
#[derive(Debug)]
pub struct NewSubmission {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub manuscript_title: String,
    pub author_name: String,
    pub institution: String,
    pub social_media: Option<String>,
    pub co_authors: Vec<CoAuthor>,
    pub viscosity: String,
    pub file_path: String,
    pub file_name: String,
    pub pdf_path: Option<String>,
    pub file_size_bytes: i64,
}

/// Row of the `preprints_with_ratings` view. Contact email is deliberately
/// not part of the view.
#[derive(Debug, FromRow, Serialize)]
pub struct Preprint {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub manuscript_title: String,
    pub author_name: String,
    pub institution: String,
    pub social_media: Option<String>,
    pub co_authors: Json<Vec<CoAuthor>>,
    pub viscosity: String,
    pub file_name: String,
    pub pdf_path: Option<String>,
    pub status: String,
    pub solicited_topic: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rating_count: i64,
    pub avg_score: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Default, FromRow, Serialize)]
pub struct RatingAggregate {
    pub rating_count: i64,
    pub avg_score: f64,
    pub weighted_score: f64,
}

/// What an author is allowed to see of a completed review: no reviewer
/// identity.
#[derive(Debug, FromRow, Serialize)]
pub struct ReviewFeedback {
    pub recommendation: Option<String>,
    pub comments_to_author: Option<String>,
    pub stink_score: Option<i16>,
}

/// Screening-queue listing row. Rating stats are filled in from the view
/// when a rated sort is requested.
#[derive(Debug, FromRow, Serialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub manuscript_title: String,
    pub author_name: String,
    pub email: String,
    pub institution: String,
    pub viscosity: String,
    pub status: String,
    pub solicited_topic: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub weighted_score: f64,
    #[sqlx(default)]
    pub rating_count: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub institution: Option<String>,
    pub social_media: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
