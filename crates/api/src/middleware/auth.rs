//! Authentication extractors.
//!
//! Protected handlers take [`AuthUser`] or [`RequireAdmin`] as an argument.
//! Both read `Authorization: Bearer <jwt>`, verify the token and load the
//! account from the database, so a disabled account or a revoked admin role
//! takes effect on the next request rather than when the token expires.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn me(AuthUser(user): AuthUser) -> ApiResult<User> {
//!     Ok(ApiResponse::ok(user))
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// An authenticated, active user.
pub struct AuthUser(pub User);

/// An authenticated, active admin.
pub struct RequireAdmin(pub User);

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
    let user = AuthService::new(state.pool(), state.jwt())
        .authenticate(token)
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::Span::current().record("user_id", user.id.as_i32());
    Ok(user)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin denied");
            return Err(AuthError::NotAdmin.into());
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
