use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;
use crate::server::AppState;

use super::Claims;

/// Extractor for routes that require a logged-in user.
///
/// Pulls the bearer token from the Authorization header and validates it
/// against the application's session keys.
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Invalid authorization header".to_string()))?;

        let claims = state.jwt.validate(token)?;
        Ok(AuthUser(claims))
    }
}
