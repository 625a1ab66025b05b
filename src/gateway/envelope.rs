//! Response envelope and failure logging.

use axum::{
    Json,
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::constants::MAX_REQUEST_BODY_BYTES;

use super::error::ApiError;

/// Envelope codes; the HTTP status always equals the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    ParamFail,
    AuthFail,
    BusinessFail,
}

impl ResponseCode {
    pub fn status(self) -> StatusCode {
        match self {
            ResponseCode::Success => StatusCode::OK,
            ResponseCode::ParamFail => StatusCode::BAD_REQUEST,
            ResponseCode::AuthFail => StatusCode::FORBIDDEN,
            ResponseCode::BusinessFail => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ResponseCode::Success => "request succeeded",
            ResponseCode::ParamFail => "parameter validation failed",
            ResponseCode::AuthFail => "authentication failed",
            ResponseCode::BusinessFail => "business processing failed",
        }
    }
}

/// `{code, message, data}` body shared by every response.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: ResponseCode::Success.status().as_u16(),
            message: ResponseCode::Success.message().to_string(),
            data: Some(data),
        }
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Attached to failed responses; read by [`log_failures`].
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub kind: &'static str,
    pub detail: String,
}

/// Logs every failed request once, with its path and body.
///
/// The body is buffered so it can be replayed after the handler ran. It is
/// logged as JSON when it parses, as lossy text otherwise, and omitted when
/// it could not be read. A body over the size limit is answered with 413.
pub async fn log_failures(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let (parts, body) = request.into_parts();

    let (bytes, response) = match to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
        Ok(bytes) => {
            let replay = Request::from_parts(parts, Body::from(bytes.clone()));
            (Some(bytes), next.run(replay).await)
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Request body could not be buffered");
            let response = ApiError::transport(StatusCode::PAYLOAD_TOO_LARGE).into_response();
            (None, response)
        }
    };

    if let Some(report) = response.extensions().get::<FailureReport>() {
        let body = bytes.as_ref().and_then(describe_body);
        match body {
            Some(body) => error!(
                path = %path,
                kind = report.kind,
                detail = %report.detail,
                body = %body,
                "Request failed"
            ),
            None => error!(
                path = %path,
                kind = report.kind,
                detail = %report.detail,
                "Request failed"
            ),
        }
    }

    response
}

/// Best-effort rendering of a request body for logs.
pub(crate) fn describe_body(bytes: &Bytes) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(json) => Some(json.to_string()),
        Err(_) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}
