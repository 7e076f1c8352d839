//! Error type shared by the CLI and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid import file: {0}")]
    InvalidImport(String),

    #[error("Field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Unknown search engine: {0}")]
    UnknownEngine(String),

    #[error("Similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Subject {0} not found")]
    SubjectNotFound(u64),

    #[error("Answer not found in subject {0}")]
    AnswerNotFound(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bad URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidImport(_)
            | AppError::EmptyField(_)
            | AppError::EmptyQuery
            | AppError::UnknownEngine(_)
            | AppError::InvalidThreshold(_) => StatusCode::BAD_REQUEST,
            AppError::SubjectNotFound(_) | AppError::AnswerNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Json(_) | AppError::Url(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

/// Reject thresholds outside `[0, 1]`, NaN included.
pub fn check_threshold(min_similarity: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&min_similarity) {
        Ok(min_similarity)
    } else {
        Err(AppError::InvalidThreshold(min_similarity))
    }
}
