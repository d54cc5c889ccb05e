use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthContext, OptionalAuth};
use crate::db::{self, CoAuthor, NewSubmission, ReviewFeedback, Submission};
use crate::error::AppError;
use crate::lifecycle::{self, Recommendation, Status, StatusLabel, Viscosity};
use crate::notify::{EmailKind, OutboundEmail};
use crate::state::AppState;
use crate::storage;

/// At most this many outstanding submissions per contact email.
pub const SUBMISSION_CAP: i64 = 5;

static EMAIL_SHAPE: OnceLock<Regex> = OnceLock::new();

fn email_shape() -> &'static Regex {
    EMAIL_SHAPE.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").unwrap())
}

#[derive(Debug, Default)]
struct SubmissionForm {
    email: String,
    manuscript_title: String,
    author_name: String,
    institution: String,
    social_media: String,
    viscosity: String,
    co_authors: Vec<CoAuthor>,
    manuscript: Option<(String, Vec<u8>)>,
    pdf: Option<Vec<u8>>,
}

async fn read_submission_form(multipart: &mut Multipart) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "email" => form.email = read_text(field).await?.trim().to_string(),
            "manuscript_title" => form.manuscript_title = read_text(field).await?,
            "author_name" => form.author_name = read_text(field).await?,
            "institution" => form.institution = read_text(field).await?,
            "social_media" => form.social_media = read_text(field).await?,
            "viscosity" => form.viscosity = read_text(field).await?,
            "co_authors" => {
                let text = read_text(field).await?;
                if !text.trim().is_empty() {
                    form.co_authors = serde_json::from_str(&text).map_err(|e| {
                        AppError::validation("co_authors", format!("Malformed co-author list: {e}"))
                    })?;
                }
            }
            "manuscript" => {
                let filename = field.file_name().unwrap_or("manuscript.docx").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.manuscript = Some((filename, data.to_vec()));
            }
            "pdf" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !data.is_empty() {
                    form.pdf = Some(data.to_vec());
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn validate_fields(form: &SubmissionForm) -> Result<(), AppError> {
    if form.author_name.trim().is_empty() {
        return Err(AppError::validation(
            "author_name",
            "Name is required / 笔名不能为空",
        ));
    }
    if !email_shape().is_match(&form.email) {
        return Err(AppError::validation(
            "email",
            "Please enter a valid email / 请输入有效邮箱",
        ));
    }
    if form.manuscript_title.trim().is_empty() {
        return Err(AppError::validation(
            "manuscript_title",
            "Title is required / 标题不能为空",
        ));
    }
    if form.institution.trim().is_empty() {
        return Err(AppError::validation(
            "institution",
            "Institution is required / 单位不能为空",
        ));
    }
    if Viscosity::parse(&form.viscosity).is_none() {
        return Err(AppError::validation(
            "viscosity",
            "Please select viscosity / 请选择粘度",
        ));
    }
    validate_co_authors(&form.co_authors)
}

fn validate_co_authors(co_authors: &[CoAuthor]) -> Result<(), AppError> {
    for (i, ca) in co_authors.iter().enumerate() {
        let position = i + 1;
        if ca.name.trim().is_empty() || ca.email.trim().is_empty() {
            return Err(AppError::validation(
                "co_authors",
                format!(
                    "Co-author #{position}: name and email are required / 共同作者 #{position} 的姓名和邮箱为必填"
                ),
            ));
        }
        if !matches!(ca.contribution.as_str(), "co-first" | "other") {
            return Err(AppError::validation(
                "co_authors",
                format!(
                    "Co-author #{position}: unknown contribution kind \"{}\"",
                    ca.contribution
                ),
            ));
        }
    }
    Ok(())
}

fn ensure_under_cap(outstanding: i64) -> Result<(), AppError> {
    if outstanding >= SUBMISSION_CAP {
        Err(AppError::CapExceeded(SUBMISSION_CAP))
    } else {
        Ok(())
    }
}

fn none_if_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    auth: OptionalAuth,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = read_submission_form(&mut multipart).await?;
    validate_fields(&form)?;

    let (original_name, data) = match &form.manuscript {
        Some((name, data)) if !data.is_empty() => (name.clone(), data.clone()),
        _ => {
            return Err(AppError::validation(
                "manuscript",
                "Please upload a file / 请上传文件",
            ))
        }
    };

    let outstanding = db::count_submissions_by_email(state.pool.as_ref(), &form.email).await?;
    ensure_under_cap(outstanding)?;

    let submission_id = Uuid::new_v4();
    let ext = storage::extension_of(&original_name);
    let filename = storage::payload_filename(&form.author_name, &form.email, ext);
    let file_path = storage::payload_path(submission_id, &filename);
    storage::write_payload(&state.config.storage_root, &file_path, &data)?;

    let pdf_path = match &form.pdf {
        Some(pdf) => {
            let pdf_name = storage::payload_filename(&form.author_name, &form.email, "pdf");
            let path = storage::payload_path(submission_id, &pdf_name);
            storage::write_payload(&state.config.storage_root, &path, pdf)?;
            Some(path)
        }
        None => None,
    };

    let new = NewSubmission {
        id: submission_id,
        user_id: auth.0.as_ref().map(|a| a.user_id),
        email: form.email.clone(),
        manuscript_title: form.manuscript_title.trim().to_string(),
        author_name: form.author_name.trim().to_string(),
        institution: form.institution.trim().to_string(),
        social_media: none_if_empty(form.social_media.clone()),
        co_authors: form.co_authors.clone(),
        viscosity: form.viscosity.clone(),
        file_path,
        file_name: original_name,
        pdf_path,
        file_size_bytes: data.len() as i64,
    };
    db::create_submission(state.pool.as_ref(), &new).await?;

    state.notifier.send(OutboundEmail {
        email: new.email.clone(),
        author_name: new.author_name.clone(),
        manuscript_title: new.manuscript_title.clone(),
        submission_id,
        kind: EmailKind::Received,
    });

    info!("Submission {} received from {}", submission_id, new.email);
    Ok(Json(json!({
        "id": submission_id,
        "status": Status::Pending.as_str(),
    })))
}

pub async fn list_my_submissions(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Vec<Submission>>, AppError> {
    let submissions = db::submissions_by_owner(state.pool.as_ref(), auth.user_id).await?;
    Ok(Json(submissions))
}

/// Completed review as the author sees it, with a display label for the
/// recommendation.
#[derive(Serialize)]
pub struct LabeledReview {
    #[serde(flatten)]
    review: ReviewFeedback,
    recommendation_label: Option<&'static str>,
}

#[derive(Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    submission: Submission,
    status_label: StatusLabel,
    viscosity_label: Option<&'static str>,
    reviews: Vec<LabeledReview>,
}

pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionDetail>, AppError> {
    let submission = db::get_submission(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Submission"))?;

    let is_owner = submission.user_id == Some(auth.user_id);
    if !is_owner && !auth.role.is_editor() {
        return Err(AppError::Forbidden(
            "This submission belongs to another author".to_string(),
        ));
    }

    let reviews = db::completed_reviews(state.pool.as_ref(), id)
        .await?
        .into_iter()
        .map(|review| {
            let recommendation_label = review
                .recommendation
                .as_deref()
                .and_then(Recommendation::parse)
                .map(Recommendation::label);
            LabeledReview {
                review,
                recommendation_label,
            }
        })
        .collect();

    let status_label = Status::parse(&submission.status)
        .unwrap_or(Status::Pending)
        .label();
    let viscosity_label = Viscosity::parse(&submission.viscosity).map(Viscosity::label);

    Ok(Json(SubmissionDetail {
        submission,
        status_label,
        viscosity_label,
        reviews,
    }))
}

/// Adopts anonymous submissions whose contact email matches the caller.
pub async fn claim_submissions(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Value>, AppError> {
    let claimed = db::claim_submissions(state.pool.as_ref(), auth.user_id, &auth.email).await?;
    if claimed > 0 {
        info!("User {} claimed {claimed} submissions", auth.user_id);
    }
    Ok(Json(json!({ "claimed": claimed })))
}

/// Replaces both payloads and sends the submission back through screening.
/// Both files are staged before anything live is touched; the metadata
/// update commits only after both renames went through.
pub async fn resubmit(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let submission = db::get_submission(state.pool.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound("Submission"))?;

    let current = Status::parse(&submission.status).unwrap_or(Status::Pending);
    lifecycle::check_resubmission(submission.user_id, auth.user_id, current)?;

    let form = read_submission_form(&mut multipart).await?;
    let (word_name, word_data) = match form.manuscript {
        Some((name, data)) if !data.is_empty() => (name, data),
        _ => {
            return Err(AppError::validation(
                "manuscript",
                "Both revised files are required / 请同时上传 Word 与 PDF 文件",
            ))
        }
    };
    let pdf_data = form.pdf.ok_or_else(|| {
        AppError::validation(
            "pdf",
            "Both revised files are required / 请同时上传 Word 与 PDF 文件",
        )
    })?;

    // The payload paths never change across revisions; a missing PDF path
    // means the first revision is adding that rendition.
    let pdf_path = submission.pdf_path.clone().unwrap_or_else(|| {
        storage::payload_path(
            id,
            &storage::payload_filename(&submission.author_name, &submission.email, "pdf"),
        )
    });

    let mut staged = storage::StagedPayloads::new(&state.config.storage_root);
    staged.stage(&submission.file_path, &word_data)?;
    staged.stage(&pdf_path, &pdf_data)?;
    staged.commit()?;

    let updated = db::apply_resubmission(
        state.pool.as_ref(),
        id,
        &word_name,
        word_data.len() as i64,
        &pdf_path,
    )
    .await?;
    if !updated {
        return Err(AppError::Conflict(
            "Submission left the revisions_requested state; reload and retry".to_string(),
        ));
    }

    info!("Submission {id} resubmitted; back in the screening queue");
    Ok(Json(json!({
        "id": id,
        "status": Status::Pending.as_str(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SubmissionForm {
        SubmissionForm {
            email: "dr@shit.org".to_string(),
            manuscript_title: "On Viscosity".to_string(),
            author_name: "Dr. Shit".to_string(),
            institution: "Septic Tank University".to_string(),
            social_media: String::new(),
            viscosity: "semi".to_string(),
            co_authors: Vec::new(),
            manuscript: Some(("paper.docx".to_string(), vec![1, 2, 3])),
            pdf: None,
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate_fields(&valid_form()).is_ok());
    }

    #[test]
    fn email_shape_is_checked() {
        let mut form = valid_form();
        form.email = "not-an-email".to_string();
        let err = validate_fields(&form).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "email"));
    }

    #[test]
    fn viscosity_outside_the_vocabulary_is_refused() {
        let mut form = valid_form();
        form.viscosity = "chunky".to_string();
        let err = validate_fields(&form).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "viscosity"));
    }

    #[test]
    fn incomplete_co_author_error_names_the_position() {
        let mut form = valid_form();
        form.co_authors = vec![
            CoAuthor {
                name: "A".to_string(),
                email: "a@b.cd".to_string(),
                institution: String::new(),
                contribution: "other".to_string(),
            },
            CoAuthor {
                name: "B".to_string(),
                email: String::new(),
                institution: String::new(),
                contribution: "co-first".to_string(),
            },
        ];
        let err = validate_fields(&form).unwrap_err();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "co_authors");
                assert!(message.contains("#2"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_contribution_kind_is_refused() {
        let mut form = valid_form();
        form.co_authors = vec![CoAuthor {
            name: "A".to_string(),
            email: "a@b.cd".to_string(),
            institution: String::new(),
            contribution: "ghostwriter".to_string(),
        }];
        assert!(validate_fields(&form).is_err());
    }

    #[test]
    fn sixth_submission_hits_the_cap() {
        for outstanding in 0..SUBMISSION_CAP {
            assert!(ensure_under_cap(outstanding).is_ok());
        }
        assert!(matches!(
            ensure_under_cap(SUBMISSION_CAP),
            Err(AppError::CapExceeded(5))
        ));
        assert!(ensure_under_cap(SUBMISSION_CAP + 3).is_err());
    }
}
