use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::auth::AuthRejection;
use crate::pipeline::{FieldError, PipelineError};

use super::envelope::{Envelope, FailureReport, ResponseCode};

/// Every failure the HTTP layer can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Param {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    Auth(AuthRejection),

    /// Routing failures (404, 405) passed through with their reason phrase.
    #[error("{message}")]
    Transport { status: StatusCode, message: String },

    #[error("{0}")]
    ModelInit(String),

    #[error("{0}")]
    Business(String),
}

impl ApiError {
    pub fn transport(status: StatusCode) -> Self {
        ApiError::Transport {
            status,
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Param { .. } => "param",
            ApiError::Auth(_) => "auth",
            ApiError::Transport { .. } => "transport",
            ApiError::ModelInit(_) => "model_init",
            ApiError::Business(_) => "business",
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Param { message, errors } => ApiError::Param { message, errors },
            PipelineError::ModelInit(inner) => ApiError::ModelInit(inner.to_string()),
            PipelineError::Business(detail) => ApiError::Business(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        PipelineError::field(FieldError::new(["body"], rejection.body_text())).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = FailureReport {
            kind: self.kind(),
            detail: self.to_string(),
        };

        let envelope: Envelope<Value> = match self {
            ApiError::Param { message, errors } => Envelope::with_status(
                ResponseCode::ParamFail.status(),
                message,
                Some(json!({ "errors": errors })),
            ),
            ApiError::Auth(_) => Envelope::with_status(
                ResponseCode::AuthFail.status(),
                ResponseCode::AuthFail.message(),
                None,
            ),
            ApiError::Transport { status, message } => {
                Envelope::with_status(status, message, None)
            }
            ApiError::ModelInit(detail) => {
                Envelope::with_status(ResponseCode::BusinessFail.status(), detail, None)
            }
            ApiError::Business(_) => Envelope::with_status(
                ResponseCode::BusinessFail.status(),
                ResponseCode::BusinessFail.message(),
                None,
            ),
        };

        let mut response = envelope.into_response();
        response.extensions_mut().insert(report);
        response
    }
}
