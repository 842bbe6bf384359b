// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::{AccessError, HashError};
use crate::storage::StoreError;

/// `WWW-Authenticate` challenge sent with every 401
pub const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Access denied")]
    Unauthenticated,

    #[error("Insufficient privilege")]
    Forbidden,

    #[error("Username taken: {0}")]
    UsernameTaken(String),

    #[error("User not found")]
    NotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential error: {0}")]
    Credential(#[from] HashError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UsernameTaken(_) => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Credential(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "AUTH_001",
            AppError::Forbidden => "AUTH_002",
            AppError::UsernameTaken(_) => "USER_001",
            AppError::NotFound => "NF_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Credential(_) => "CRED_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Access denied".to_string(),
            AppError::Forbidden => "Insufficient privilege".to_string(),
            AppError::UsernameTaken(_) => "Username is already taken".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::InvalidInput(reason) => format!("Invalid input: {reason}"),
            AppError::Credential(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(name) => AppError::UsernameTaken(name),
            StoreError::NotFound => AppError::NotFound,
            StoreError::Hash(e) => AppError::Credential(e),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => AppError::Unauthenticated,
            AccessError::Forbidden => AppError::Forbidden,
            // An authenticated caller that cannot be resolved is our fault, not theirs.
            AccessError::Lookup(e) => AppError::Internal(format!("caller lookup failed: {e}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else {
            tracing::warn!(code = error_code, error = %self, "request rejected");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        assert_eq!(AppError::Unauthenticated.to_string(), "Access denied");
        assert_eq!(
            AppError::UsernameTaken("alice".to_string()).to_string(),
            "Username taken: alice"
        );
        assert_eq!(
            AppError::InvalidInput("empty email".to_string()).to_string(),
            "Invalid input: empty email"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::UsernameTaken("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InvalidInput("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_and_access_conversions() {
        assert!(matches!(
            AppError::from(StoreError::UsernameTaken("bob".into())),
            AppError::UsernameTaken(name) if name == "bob"
        ));
        assert!(matches!(AppError::from(StoreError::NotFound), AppError::NotFound));
        assert!(matches!(
            AppError::from(AccessError::Unauthenticated),
            AppError::Unauthenticated
        ));
        assert!(matches!(AppError::from(AccessError::Forbidden), AppError::Forbidden));

        let lookup = AppError::from(AccessError::Lookup(StoreError::NotFound));
        assert_eq!(lookup.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sanitized_messages_hide_detail() {
        let err = AppError::Internal("index corrupt at 0xdead".to_string());
        assert!(!err.sanitized_message().contains("0xdead"));
        assert_eq!(
            AppError::UsernameTaken("alice".into()).sanitized_message(),
            "Username is already taken"
        );
    }

    #[test]
    fn test_unauthorized_response_carries_challenge() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_CHALLENGE
        );

        let response = AppError::Forbidden.into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }
}
