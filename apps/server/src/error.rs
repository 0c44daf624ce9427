// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use curiosity_processing::{ConfigError, PipelineError};
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing file in request")]
    MissingFile,

    #[error("Unsupported file type: {0} (expected .step or .stp)")]
    UnsupportedFileType(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    /// Shown to the user as-is, prefixed like the dashboard does
    #[error("Error: {0}")]
    Import(String),

    #[error("Error: {0}")]
    Export(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ApiError::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE_TYPE"),
            ApiError::InvalidField { .. } => (StatusCode::BAD_REQUEST, "INVALID_FIELD"),
            ApiError::Config(_) => (StatusCode::BAD_REQUEST, "INVALID_CONFIG"),
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MULTIPART_ERROR"),
            ApiError::Import(_) => (StatusCode::UNPROCESSABLE_ENTITY, "IMPORT_ERROR"),
            ApiError::Export(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EXPORT_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Import(message) => ApiError::Import(message),
            PipelineError::Export(message) => ApiError::Export(message),
        }
    }
}
