//! Bearer-token gate.
//!
//! [`AuthPolicy::check`] is a pure function of the request method and the
//! `Authorization` header; [`require_bearer`] wraps it as axum middleware.
//! When auth is enabled without any accepted token, every request is refused.


use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::gateway::error::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("auth is enabled but no tokens are configured")]
    NoKeysConfigured,
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a Bearer credential")]
    InvalidScheme,
    #[error("bearer token is not accepted")]
    UnknownToken,
}

#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    enabled: bool,
    keys: HashSet<String>,
}

impl AuthPolicy {
    pub fn new(enabled: bool, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            enabled,
            keys: keys.into_iter().collect(),
        }
    }

    /// No auth: every request passes.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluates the gate rules in order.
    pub fn check(&self, method: &Method, authorization: Option<&str>) -> Result<(), AuthRejection> {
        if *method == Method::OPTIONS || !self.enabled {
            return Ok(());
        }
        if self.keys.is_empty() {
            return Err(AuthRejection::NoKeysConfigured);
        }

        let value = authorization.ok_or(AuthRejection::MissingHeader)?;
        let scheme_ok = value
            .get(..BEARER_PREFIX.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX));
        if !scheme_ok {
            return Err(AuthRejection::InvalidScheme);
        }

        let token = value[BEARER_PREFIX.len()..].trim();
        if self.keys.contains(token) {
            Ok(())
        } else {
            Err(AuthRejection::UnknownToken)
        }
    }
}

impl From<&AuthConfig> for AuthPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.enabled, config.keys.iter().cloned())
    }
}

/// Middleware applying [`AuthPolicy`] to every request.
pub async fn require_bearer(
    State(policy): State<Arc<AuthPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    match policy.check(request.method(), authorization) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            debug!(path = %request.uri().path(), reason = %rejection, "Request rejected");
            ApiError::Auth(rejection).into_response()
        }
    }
}
