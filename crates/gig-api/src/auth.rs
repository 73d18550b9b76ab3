//! Bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use gig_models::{Role, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Authenticated caller, resolved from a verified session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: Role,
}

/// Pull the raw token from `x-auth-token`, falling back to
/// `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap) -> ApiResult<&str> {
    if let Some(value) = headers.get(AUTH_TOKEN_HEADER) {
        let token = value
            .to_str()
            .map_err(|_| ApiError::token_invalid("Token header is not valid text"))?
            .trim();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::token_invalid("No token, authorization denied"))?
        .to_str()
        .map_err(|_| ApiError::token_invalid("Authorization header is not valid text"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::token_invalid("Invalid Authorization header format"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)?;
        let claims = state.tokens.verify(token)?;

        Ok(AuthUser {
            user_id: UserId::from_string(claims.sub),
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_custom_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).unwrap(), "xyz");
    }

    #[test]
    fn test_missing_or_malformed() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(ApiError::TokenInvalid(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(matches!(extract_token(&headers), Err(ApiError::TokenInvalid(_))));
    }
}
