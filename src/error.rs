use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    auth::services::AuthError,
    query::QueryError,
    response::{Envelope, Status},
};

/// Request-boundary error; every variant renders as one JSON envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("email or username already exists")]
    DuplicateCredential,
    #[error("invalid credentials")]
    AuthenticationFailed,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Query(#[from] QueryError),
    // Surfaces the driver message to the client.
    #[error("{0}")]
    Storage(String),
    #[error("password hashing failed")]
    Hashing,
    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::DuplicateCredential => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Query(_) | ApiError::Storage(_) | ApiError::Hashing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

// Extractor rejections are client mistakes whatever axum's own status says.
impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::Validation(r.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        ApiError::Validation(r.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::Validation(r.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::DuplicateCredential => ApiError::DuplicateCredential,
            AuthError::AuthenticationFailed => ApiError::AuthenticationFailed,
            AuthError::Hashing(_) => ApiError::Hashing,
            AuthError::Storage(e) => ApiError::Storage(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let status = if code.is_server_error() {
            error!(error = %self, "request failed");
            Status::Error
        } else {
            warn!(error = %self, %code, "request rejected");
            Status::Fail
        };
        (code, Envelope::message(status, self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_errors_render_as_fail() {
        let (status, body) = body_json(ApiError::DuplicateCredential).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "email or username already exists");

        let (status, body) = body_json(ApiError::Validation("email is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "email is required");

        let (status, _) = body_json(ApiError::NotFound("media")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn timeout_is_an_enveloped_408() {
        let (status, body) = body_json(ApiError::Timeout).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "request timed out");
    }

    #[tokio::test]
    async fn authentication_failure_is_401() {
        let (status, body) = body_json(ApiError::AuthenticationFailed).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "invalid credentials");
    }

    #[tokio::test]
    async fn server_errors_render_as_error() {
        let (status, body) = body_json(ApiError::Storage("connection reset".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "connection reset");

        let (status, body) =
            body_json(QueryError::InvalidFilterSpec("m.bogus".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn auth_errors_map_to_matching_variants() {
        assert!(matches!(
            ApiError::from(AuthError::AuthenticationFailed),
            ApiError::AuthenticationFailed
        ));
        assert!(matches!(
            ApiError::from(AuthError::DuplicateCredential),
            ApiError::DuplicateCredential
        ));
        assert!(matches!(
            ApiError::from(AuthError::Validation("x".into())),
            ApiError::Validation(_)
        ));
    }
}
