//! Host token extraction from the `Authorization` header.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The bearer token sent with a request, if any.
///
/// Extraction never fails; the service decides whether a missing token is
/// `401` or a wrong one `403`.
#[derive(Debug, Clone, Default)]
pub struct HostToken(pub Option<String>);

impl HostToken {
    /// Borrows the token.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for HostToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer);
        Ok(Self(token))
    }
}

/// Extracts the token from `Bearer <token>`, case-insensitive on the scheme.
fn parse_bearer(value: &str) -> Option<String> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
