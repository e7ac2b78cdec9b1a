//! OTP login flow and session endpoints.

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::mail::{otp_email_html, OutboundMail};
use crate::server::AppState;
use crate::store::{OtpChallenge, UserRecord};

#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub user: VerifiedProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedProfile {
    pub name: Option<String>,
    pub email: String,
    pub verification_status: String,
}

/// Step 1: request an OTP by email
#[tracing::instrument(name = "http.request_otp", skip(state, request), fields(email = %request.email))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<RequestOtpRequest>,
) -> Result<Json<MessageResponse>> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    let email = request.email.trim().to_string();

    state
        .stores
        .users
        .upsert(UserRecord::new(email.clone(), request.name.clone()))
        .await?;

    let otp_config = &state.settings.otp;
    let is_test_user = otp_config.test_user.as_deref() == Some(email.as_str());

    let (code, ttl_minutes) = if is_test_user {
        (otp_config.test_code.clone(), otp_config.test_ttl_minutes)
    } else {
        let code = rand::rng().random_range(100_000..=999_999).to_string();
        (code, otp_config.ttl_minutes)
    };

    state
        .stores
        .users
        .set_otp(
            &email,
            Some(OtpChallenge {
                code: code.clone(),
                expires_at: Utc::now() + Duration::minutes(ttl_minutes),
            }),
        )
        .await?;

    if is_test_user {
        return Ok(Json(MessageResponse {
            message: format!("Test OTP set. Use {} to login.", otp_config.test_code),
        }));
    }

    state
        .mailer
        .send(OutboundMail {
            to: email,
            subject: "Your VoltQ OTP Code".to_string(),
            html: otp_email_html(&code, ttl_minutes),
        })
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send OTP mail: {}", e)))?;

    Ok(Json(MessageResponse {
        message: "OTP sent to email".to_string(),
    }))
}

/// Step 2: verify the OTP and open a session
#[tracing::instrument(name = "http.verify_otp", skip(state, request), fields(email = %request.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state.stores.users.find_by_email(&request.email).await?;

    let valid = user
        .as_ref()
        .and_then(|u| u.otp.as_ref())
        .map(|challenge| challenge.code == request.otp && !challenge.is_expired())
        .unwrap_or(false);

    let Some(user) = user.filter(|_| valid) else {
        return Err(AppError::Validation("Invalid or expired OTP".to_string()));
    };

    // Clear the challenge after successful verification
    state.stores.users.set_otp(&user.email, None).await?;

    let token = state.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, email = %user.email, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Session probe for the app's splash screen
pub async fn check_session(AuthUser(claims): AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        message: "Authenticated".to_string(),
        user: UserProfile {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        },
    })
}

/// Profile plus verification status for the logged-in user
#[tracing::instrument(name = "http.verify_token", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn verify_token(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<VerifyTokenResponse>> {
    let user = state
        .stores
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let verification_status = state
        .stores
        .verifications
        .find_by_user(&user.id)
        .await?
        .map(|v| v.status.as_str().to_string())
        .unwrap_or_else(|| "not_submitted".to_string());

    Ok(Json(VerifyTokenResponse {
        user: VerifiedProfile {
            name: user.name,
            email: user.email,
            verification_status,
        },
    }))
}
