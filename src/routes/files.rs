use axum::{
    body::Body,
    extract::{Path, State},
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::OptionalAuth;
use crate::db;
use crate::error::AppError;
use crate::lifecycle::Status;
use crate::state::AppState;
use crate::storage;

/// Streams a stored payload. Pool-visible submissions are public; anything
/// else is restricted to the owning author and editors. The visibility
/// check is what stands in for a time-limited signed URL.
pub async fn download_payload(
    State(state): State<Arc<AppState>>,
    auth: OptionalAuth,
    Path((submission_id, file_name)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    if file_name.is_empty() || file_name.contains("..") || file_name.contains('/') {
        return Err(AppError::NotFound("File"));
    }

    let submission = db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or(AppError::NotFound("Submission"))?;

    let status = Status::parse(&submission.status).unwrap_or(Status::Pending);
    if !status.in_pool() {
        let allowed = matches!(
            &auth.0,
            Some(actor) if actor.role.is_editor() || submission.user_id == Some(actor.user_id)
        );
        if !allowed {
            return Err(AppError::Forbidden(
                "This manuscript is not publicly available / 稿件未公开".to_string(),
            ));
        }
    }

    // Only the canonical payload paths of this submission are servable.
    let rel_path = storage::payload_path(submission_id, &file_name);
    if rel_path != submission.file_path && Some(&rel_path) != submission.pdf_path.as_ref() {
        return Err(AppError::NotFound("File"));
    }

    let content = match storage::read_payload(&state.config.storage_root, &rel_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File"))
        }
        Err(e) => return Err(AppError::Storage(e)),
    };

    let mime = mime_guess::from_path(&file_name)
        .first_raw()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .header("Content-Type", mime)
        .header(
            "Content-Disposition",
            format!("inline; filename=\"{}\"", file_name),
        )
        .body(Body::from(content))
        .map_err(|e| AppError::Internal(e.to_string()))
}
