//! API error types
//!
//! Every failure leaves the server as an OpenAI-style envelope:
//! `{"error": {"message", "type", "param", "code"}}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mofa_speech::error::{AdapterError, CoordinatorError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    InvalidRequest {
        message: String,
        param: Option<&'static str>,
        code: &'static str,
    },

    #[error("File size ({size} bytes) exceeds maximum allowed size ({max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Request body exceeds maximum allowed size ({max} bytes)")]
    BodyTooLarge { max: u64 },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(param: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            param: Some(param),
            code,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::FileTooLarge { .. } | ApiError::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Coordinator(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Coordinator(CoordinatorError::Inference {
                source: AdapterError::Unsupported(_),
                ..
            }) => StatusCode::BAD_REQUEST,
            ApiError::Coordinator(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorDetail {
        let (kind, param, code) = match self {
            ApiError::InvalidRequest { param, code, .. } => ("invalid_request_error", *param, *code),
            ApiError::FileTooLarge { .. } | ApiError::BodyTooLarge { .. } => {
                ("invalid_request_error", Some("file"), "file_too_large")
            }
            ApiError::Coordinator(e) => match e {
                CoordinatorError::LoadFailed { .. } | CoordinatorError::UnloadFailed { .. } => {
                    ("server_error", None, "model_loading_failed")
                }
                CoordinatorError::SwitchTimeout { .. } | CoordinatorError::NotResident { .. } => {
                    ("server_error", None, "model_not_ready")
                }
                CoordinatorError::Inference {
                    source: AdapterError::Unsupported(_),
                    ..
                } => ("invalid_request_error", Some("response_format"), "unsupported_format"),
                _ => ("server_error", None, "processing_failed"),
            },
            ApiError::Internal(_) => ("server_error", None, "request_failed"),
        };
        ErrorDetail {
            message: self.to_string(),
            kind,
            param,
            code,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
    param: Option<&'static str>,
    code: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(ErrorEnvelope { error: self.body() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
