use std::future::Future;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ir_common::{ProfileError, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Run `fut` with `request_id` visible to error responses it produces.
pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    match request_id {
        Some(request_id) => REQUEST_ID.scope(request_id, fut).await,
        None => fut.await,
    }
}

fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Failures of the profile endpoint and the probes. Public messages are fixed
/// per variant; the detail carried inside a variant is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("identity id must not be empty")]
    InvalidIdentity,
    #[error("profile store unavailable: {0}")]
    ProfileStoreUnavailable(StoreError),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("not ready: {0}")]
    NotReady(String),
    #[error("no such route")]
    RouteNotFound,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    code: &'static str,
    message: &'static str,
    request_id: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidIdentity => StatusCode::BAD_REQUEST,
            ApiError::ProfileStoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        let (code, message) = match self {
            ApiError::Unauthenticated(_) => ("unauthorized", "authentication required"),
            ApiError::InvalidIdentity => ("invalid_identity", "identity id must not be empty"),
            ApiError::ProfileStoreUnavailable(_) => ("database_error", "profile store unavailable"),
            ApiError::RateLimited => ("too_many_requests", "too many requests"),
            ApiError::NotReady(_) => ("service_unavailable", "service not ready"),
            ApiError::RouteNotFound => ("not_found", "no such route"),
        };

        ErrorEnvelope {
            code,
            message,
            request_id: current_request_id(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = self.envelope();
        let request_id = envelope.request_id.as_deref().unwrap_or("");

        if status.is_server_error() {
            error!(code = envelope.code, request_id, error = %self, "profile_request_failed");
        } else {
            warn!(code = envelope.code, request_id, error = %self, "profile_request_rejected");
        }

        (status, Json(envelope)).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(value: ProfileError) -> Self {
        match value {
            ProfileError::InvalidIdentity => ApiError::InvalidIdentity,
            ProfileError::PrimaryUnavailable(err) => ApiError::ProfileStoreUnavailable(err),
        }
    }
}
