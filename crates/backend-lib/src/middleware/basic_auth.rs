use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

use crate::{error::AppError, AppState};

/// Credentials carried by an `Authorization: Basic ...` header
pub struct BasicCredentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BasicCredentials {
    /// Decode the `Authorization` header; `None` when absent or malformed
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).ok()?);
        let decoded = std::str::from_utf8(&decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(Self {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
        })
    }
}

/// Authenticate every request and attach the caller's
/// [`Principal`](crate::auth::Principal) to the request extensions
pub async fn basic_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credentials =
        BasicCredentials::from_headers(request.headers()).ok_or(AppError::Unauthenticated)?;

    // Argon2 is CPU bound; keep it off the async workers.
    let guard = state.guard.clone();
    let principal = tokio::task::spawn_blocking(move || {
        guard.authenticate(&credentials.username, credentials.password.as_bytes())
    })
    .await??;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_decodes_basic_header() {
        let encoded = STANDARD.encode("alice:p1:with:colons");
        let creds = BasicCredentials::from_headers(&headers(&format!("Basic {encoded}"))).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password.as_str(), "p1:with:colons");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let encoded = STANDARD.encode("bob:pw");
        assert!(BasicCredentials::from_headers(&headers(&format!("basic {encoded}"))).is_some());
    }

    #[test]
    fn test_rejects_malformed_headers() {
        assert!(BasicCredentials::from_headers(&HeaderMap::new()).is_none());
        assert!(BasicCredentials::from_headers(&headers("Bearer abc")).is_none());
        assert!(BasicCredentials::from_headers(&headers("Basic !!!notbase64")).is_none());

        let no_colon = STANDARD.encode("justuser");
        assert!(BasicCredentials::from_headers(&headers(&format!("Basic {no_colon}"))).is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let encoded = STANDARD.encode("carol:topsecret");
        let creds = BasicCredentials::from_headers(&headers(&format!("Basic {encoded}"))).unwrap();
        assert!(!format!("{creds:?}").contains("topsecret"));
    }
}
