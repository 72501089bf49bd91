//! Bearer token extractors.
//!
//! Handlers that need a signed-in shopper take [`RequireAuth`]; admin-only
//! handlers take [`RequireAdmin`]. Both read `Authorization: Bearer <token>`
//! and verify it with the state's [`TokenService`](crate::services::TokenService).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use furnish_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{AuthError, Claims, token_from_header};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with `401` and `{"error": ...}` when the header is missing or the
/// token does not verify.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}!", claims.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Claims);

impl RequireAuth {
    /// The authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0.sub
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(token_from_header)
            .ok_or(AuthError::MissingToken)?;

        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;

        Span::current().record("user_id", claims.sub.as_i32());
        set_sentry_user(&claims.sub);

        Ok(Self(claims))
    }
}

/// Extractor that requires a valid bearer token with the admin role.
///
/// Rejects with `401` like [`RequireAuth`], then with `403` for non-admins.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        if !claims.is_admin() {
            tracing::warn!(user_id = %claims.sub, path = %parts.uri.path(), "Admin access denied");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(claims))
    }
}
