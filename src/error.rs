use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::TransitionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Submission cap reached: at most {0} outstanding submissions per author / 每位作者最多 {0} 篇在审稿件")]
    CapExceeded(i64),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> AppError {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotEditor => {
                AppError::Forbidden("Editor role required / 需要编辑权限".to_string())
            }
            TransitionError::NotOwner => AppError::Forbidden(
                "Only the submitting author may do this / 仅限投稿作者本人操作".to_string(),
            ),
            TransitionError::IllegalTransition { from, to } => AppError::Conflict(format!(
                "Cannot move a {} submission to {}",
                from.as_str(),
                to.as_str()
            )),
            TransitionError::NotResubmittable { from } => AppError::Conflict(format!(
                "Resubmission is only possible after revisions are requested (current status: {})",
                from.as_str()
            )),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::CapExceeded(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        (status, Json(json!({ "error": self.to_string(), "field": field }))).into_response()
    }
}
