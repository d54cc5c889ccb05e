mod models;

pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::lifecycle::Status;
use crate::ratings::PreprintSort;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

pub async fn create_submission(pool: &PgPool, new: &NewSubmission) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO submissions
            (id, user_id, email, manuscript_title, author_name, institution,
             social_media, co_authors, viscosity, file_path, file_name,
             pdf_path, file_size_bytes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(new.id)
    .bind(new.user_id)
    .bind(&new.email)
    .bind(&new.manuscript_title)
    .bind(&new.author_name)
    .bind(&new.institution)
    .bind(&new.social_media)
    .bind(Json(&new.co_authors))
    .bind(&new.viscosity)
    .bind(&new.file_path)
    .bind(&new.file_name)
    .bind(&new.pdf_path)
    .bind(new.file_size_bytes)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_submission(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn submissions_by_owner(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn count_submissions_by_email(pool: &PgPool, email: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Adopts anonymous submissions whose contact email matches a freshly
/// authenticated user. Returns how many rows were claimed.
pub async fn claim_submissions(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions SET user_id = $1 WHERE email = $2 AND user_id IS NULL",
    )
    .bind(user_id)
    .bind(email)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Applies an editor decision, guarded on the expected current status so a
/// racing second decision gets zero rows instead of a silent overwrite.
pub async fn apply_decision(
    pool: &PgPool,
    id: Uuid,
    expected: Status,
    target: Status,
    editor_id: Uuid,
    notes: Option<&str>,
    solicited_topic: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET status = $3, screened_at = now(), screened_by = $4,
            screening_notes = $5, solicited_topic = $6
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(expected.as_str())
    .bind(target.as_str())
    .bind(editor_id)
    .bind(notes)
    .bind(solicited_topic)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Commits a resubmission: back to the screening queue with fresh file
/// metadata and cleared screening fields. Guarded on the current status.
pub async fn apply_resubmission(
    pool: &PgPool,
    id: Uuid,
    file_name: &str,
    file_size_bytes: i64,
    pdf_path: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET status = 'pending', file_name = $2, file_size_bytes = $3, pdf_path = $4,
            screening_notes = NULL, screened_at = NULL, screened_by = NULL
        WHERE id = $1 AND status = 'revisions_requested'
        "#,
    )
    .bind(id)
    .bind(file_name)
    .bind(file_size_bytes)
    .bind(pdf_path)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Screening queue
// ---------------------------------------------------------------------------

const QUEUE_COLUMNS: &str = "id, manuscript_title, author_name, email, institution, \
                             viscosity, status, solicited_topic, created_at";

pub async fn screening_queue(
    pool: &PgPool,
    statuses: &[Status],
    oldest_first: bool,
) -> Result<Vec<QueueEntry>, sqlx::Error> {
    let order = if oldest_first {
        "created_at ASC"
    } else {
        "created_at DESC"
    };

    if statuses.is_empty() {
        return sqlx::query_as::<_, QueueEntry>(&format!(
            "SELECT {QUEUE_COLUMNS} FROM submissions ORDER BY {order}"
        ))
        .fetch_all(pool)
        .await;
    }

    let filter: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {QUEUE_COLUMNS} FROM submissions WHERE status = ANY($1) ORDER BY {order}"
    ))
    .bind(filter)
    .fetch_all(pool)
    .await
}

pub async fn queue_counts(pool: &PgPool) -> Result<QueueCounts, sqlx::Error> {
    sqlx::query_as::<_, QueueCounts>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'pending') AS pending,
            COUNT(*) FILTER (WHERE status IN ('under_review', 'accepted')) AS approved,
            COUNT(*) FILTER (WHERE status IN ('rejected', 'flushed', 'revisions_requested')) AS rejected,
            COUNT(*) AS total
        FROM submissions
        "#,
    )
    .fetch_one(pool)
    .await
}

/// (submission id, weighted score, rating count) for every pool-visible
/// submission; used for in-code sorting of the screening queue.
pub async fn rating_stats(pool: &PgPool) -> Result<Vec<(Uuid, f64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, f64, i64)>(
        "SELECT id, weighted_score, rating_count FROM preprints_with_ratings",
    )
    .fetch_all(pool)
    .await
}

// ---------------------------------------------------------------------------
// Preprint pool
// ---------------------------------------------------------------------------

const PREPRINT_COLUMNS: &str = "id, user_id, manuscript_title, author_name, institution, \
                                social_media, co_authors, viscosity, file_name, pdf_path, \
                                status, solicited_topic, created_at, rating_count, \
                                avg_score, weighted_score";

fn preprint_order(sort: PreprintSort) -> &'static str {
    match sort {
        PreprintSort::Newest => "created_at DESC",
        PreprintSort::HighestRated => "weighted_score DESC, rating_count DESC",
        PreprintSort::MostRated => "rating_count DESC, weighted_score DESC",
    }
}

pub async fn list_preprints(
    pool: &PgPool,
    sort: PreprintSort,
    topic: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Preprint>, sqlx::Error> {
    let order = preprint_order(sort);
    match topic {
        Some(topic) => {
            sqlx::query_as::<_, Preprint>(&format!(
                "SELECT {PREPRINT_COLUMNS} FROM preprints_with_ratings \
                 WHERE solicited_topic = $1 ORDER BY {order} LIMIT $2 OFFSET $3"
            ))
            .bind(topic)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Preprint>(&format!(
                "SELECT {PREPRINT_COLUMNS} FROM preprints_with_ratings \
                 ORDER BY {order} LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn count_preprints(pool: &PgPool, topic: Option<&str>) -> Result<i64, sqlx::Error> {
    match topic {
        Some(topic) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM preprints_with_ratings WHERE solicited_topic = $1",
            )
            .bind(topic)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM preprints_with_ratings")
                .fetch_one(pool)
                .await
        }
    }
}

pub async fn get_preprint(pool: &PgPool, id: Uuid) -> Result<Option<Preprint>, sqlx::Error> {
    sqlx::query_as::<_, Preprint>(&format!(
        "SELECT {PREPRINT_COLUMNS} FROM preprints_with_ratings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn preprint_aggregates(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<RatingAggregate>, sqlx::Error> {
    sqlx::query_as::<_, RatingAggregate>(
        "SELECT rating_count, avg_score, weighted_score FROM preprints_with_ratings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// One row per (rater, submission): a repeat rating overwrites the score.
pub async fn upsert_rating(
    pool: &PgPool,
    user_id: Uuid,
    submission_id: Uuid,
    score: i16,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO preprint_ratings (user_id, submission_id, score)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, submission_id)
        DO UPDATE SET score = EXCLUDED.score, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(submission_id)
    .bind(score)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_user_rating(
    pool: &PgPool,
    user_id: Uuid,
    submission_id: Uuid,
) -> Result<Option<i16>, sqlx::Error> {
    sqlx::query_scalar::<_, i16>(
        "SELECT score FROM preprint_ratings WHERE user_id = $1 AND submission_id = $2",
    )
    .bind(user_id)
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// Author-visible feedback: completed reviews only, reviewer identity
/// stripped.
pub async fn completed_reviews(
    pool: &PgPool,
    submission_id: Uuid,
) -> Result<Vec<ReviewFeedback>, sqlx::Error> {
    sqlx::query_as::<_, ReviewFeedback>(
        r#"
        SELECT recommendation, comments_to_author, stink_score
        FROM reviews
        WHERE submission_id = $1 AND status = 'completed'
        ORDER BY id
        "#,
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_review(
    pool: &PgPool,
    submission_id: Uuid,
    reviewer_id: Uuid,
    recommendation: &str,
    comments_to_author: Option<&str>,
    stink_score: Option<i16>,
    completed: bool,
) -> Result<(), sqlx::Error> {
    let status = if completed { "completed" } else { "draft" };
    sqlx::query(
        r#"
        INSERT INTO reviews
            (submission_id, reviewer_id, recommendation, comments_to_author, stink_score, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(submission_id)
    .bind(reviewer_id)
    .bind(recommendation)
    .bind(comments_to_author)
    .bind(stink_score)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Creates or updates the caller's profile. Role is never touched here;
/// editor/reviewer grants happen out of band.
pub async fn upsert_profile(
    pool: &PgPool,
    id: Uuid,
    display_name: &str,
    institution: Option<&str>,
    social_media: Option<&str>,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, display_name, institution, social_media)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET display_name = EXCLUDED.display_name,
            institution = EXCLUDED.institution,
            social_media = EXCLUDED.social_media
        RETURNING id, display_name, institution, social_media, role, created_at
        "#,
    )
    .bind(id)
    .bind(display_name)
    .bind(institution)
    .bind(social_media)
    .fetch_one(pool)
    .await
}
