use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

use super::AppState;

/// Admin capability gate.
///
/// Validates the X-Admin-Key header against the configured admin key.
/// While no key is configured every admin request is rejected; these
/// routes mutate user-visible state, so there is no development bypass.
pub async fn admin_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected_key) = &state.settings.admin.key else {
        tracing::warn!("Admin route rejected, no admin key configured");
        return Err(AppError::Forbidden("Admin access is not configured".to_string()));
    };

    let provided = req
        .headers()
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == expected_key => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("Invalid admin key provided");
            Err(AppError::Forbidden("Invalid admin key".to_string()))
        }
        None => Err(AppError::Forbidden("Missing admin key".to_string())),
    }
}
