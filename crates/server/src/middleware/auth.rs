//! Authentication extractors.
//!
//! Handlers opt into authentication by taking one of these extractors as an
//! argument. Tokens come from the `Authorization: Bearer <jwt>` header.
//!
//! ```rust,ignore
//! async fn profile(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
//!     format!("hello, {}", claims.name)
//! }
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::Admin;
use crate::services::auth::{AuthService, Claims};
use crate::state::AppState;

/// Requires a valid access token; rejects with 401 otherwise.
pub struct RequireAuth(pub Claims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let claims = AuthService::new(state.store(), state.config())
            .verify_access_token(token)
            .map_err(|_| AppError::Unauthorized)?;
        Ok(Self(claims))
    }
}

/// Requires a valid admin access token.
///
/// Beyond the `isAdmin` claim, the admin account must still exist, so
/// deleting an admin revokes their outstanding tokens.
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;
        if !claims.is_admin {
            return Err(AppError::Forbidden("Admin access required"));
        }
        let exists = state
            .store()
            .collection::<Admin>()
            .find_by_id(claims.sub)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::Unauthorized);
        }
        Ok(Self(claims))
    }
}

/// Extracts claims when a valid token is present, `None` otherwise.
///
/// A missing, malformed, or expired token never rejects; the request simply
/// proceeds as a guest.
pub struct OptionalAuth(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts).and_then(|token| {
            AuthService::new(state.store(), state.config())
                .verify_access_token(token)
                .ok()
        });
        Ok(Self(claims))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/profile");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(
            bearer_token(&parts_with_auth(Some("Bearer abc.def.ghi"))),
            Some("abc.def.ghi")
        );
        assert_eq!(bearer_token(&parts_with_auth(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with_auth(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with_auth(None)), None);
    }
}
