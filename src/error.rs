use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure surface of the document store, shared by every store backend.
///
/// The wire codes returned by [`StoreError::code`] are what the HTTP layer
/// puts in error bodies and what the HTTP client maps back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The caller holds no credential the backend accepts.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unauthenticated(_) => "unauthenticated",
            StoreError::PermissionDenied(_) => "permission-denied",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::NotFound(_) => "not-found",
            StoreError::Other(_) => "unknown",
        }
    }

    pub fn from_code(code: &str, detail: String) -> Self {
        match code {
            "unauthenticated" => StoreError::Unauthenticated(detail),
            "permission-denied" => StoreError::PermissionDenied(detail),
            "unavailable" => StoreError::Unavailable(detail),
            "not-found" => StoreError::NotFound(detail),
            _ => StoreError::Other(detail),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Resource not found".to_string()),
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::Tls(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
            sqlx::Error::Database(db) => {
                // 42501 insufficient_privilege, 28000/28P01 authorization failures
                match db.code().as_deref() {
                    Some("42501") | Some("28000") | Some("28P01") => {
                        StoreError::PermissionDenied(db.message().to_string())
                    }
                    Some(code) if code.starts_with("08") => {
                        StoreError::Unavailable(db.message().to_string())
                    }
                    _ => StoreError::Other(db.message().to_string()),
                }
            }
            other => StoreError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) | Error::Validation(_) => "invalid-argument",
            Error::Unauthorized(_) => "unauthenticated",
            Error::NotFound(_) => "not-found",
            Error::PermissionDenied(_) => "permission-denied",
            Error::Unavailable(_) | Error::Reqwest(_) => "unavailable",
            _ => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let code = self.code();
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg),
            Error::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated(msg) => Error::Unauthorized(msg),
            StoreError::PermissionDenied(msg) => Error::PermissionDenied(msg),
            StoreError::Unavailable(msg) => Error::Unavailable(msg),
            StoreError::NotFound(msg) => Error::NotFound(msg),
            StoreError::Other(msg) => Error::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_codes_survive_the_wire() {
        let errs = [
            StoreError::Unauthenticated("x".into()),
            StoreError::PermissionDenied("x".into()),
            StoreError::Unavailable("x".into()),
            StoreError::NotFound("x".into()),
            StoreError::Other("x".into()),
        ];
        for err in errs {
            assert_eq!(StoreError::from_code(err.code(), "x".into()), err);
        }
    }

    #[test]
    fn unauthenticated_is_not_permission_denied() {
        let err = StoreError::from_code("unauthenticated", "token".into());
        assert!(matches!(err, StoreError::Unauthenticated(_)));
        let err = StoreError::from_code("permission-denied", "rules".into());
        assert!(matches!(err, StoreError::PermissionDenied(_)));

        let resp = Error::from(StoreError::Unauthenticated("token".into())).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn http_error_keeps_store_category() {
        let err: Error = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.code(), "unavailable");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
