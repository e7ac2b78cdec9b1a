//! User verification intake and review.
//!
//! Submission and approval each trigger an SMS and a push notification.
//! Both side channels are contained: a provider failure is reported in
//! the response body, never by failing the state change itself.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::push::PushMessage;
use crate::server::AppState;
use crate::sms::normalize_phone;
use crate::store::{VerificationRecord, VerificationStatus};

use super::notifications::{notify_user, NotificationResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVerificationRequest {
    pub name: String,
    pub phone: String,
    pub aadhar_card: String,
    pub license_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationActionResponse {
    pub message: String,
    /// "sent" or "failed"; the underlying record change already happened
    pub sms_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_result: Option<NotificationResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<VerificationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Submit verification data
#[tracing::instrument(name = "http.submit_verification", skip(state, claims, request), fields(user_id = %claims.sub))]
pub async fn submit_verification(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<SubmitVerificationRequest>,
) -> Result<Json<VerificationActionResponse>> {
    for (field, value) in [
        ("name", &request.name),
        ("phone", &request.phone),
        ("aadharCard", &request.aadhar_card),
        ("licenseId", &request.license_id),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
    }

    if state
        .stores
        .verifications
        .find_by_user(&claims.sub)
        .await?
        .is_some()
    {
        return Err(AppError::Validation("Already submitted".to_string()));
    }

    let record = state
        .stores
        .verifications
        .create(VerificationRecord::new(
            claims.sub.clone(),
            request.name.trim(),
            request.phone.trim(),
            request.aadhar_card.trim(),
            request.license_id.trim(),
        ))
        .await?;

    let sms_status = send_sms(
        &state,
        &record.phone,
        &format!(
            "Hello {}, your verification has been submitted successfully. Status: Pending. We will notify you once it's reviewed.",
            record.name
        ),
    )
    .await;

    let notification_result = notify_user(
        &state,
        &claims.sub,
        PushMessage::new(
            "Verification Submitted",
            "Your verification request has been submitted and is pending review.",
            Some(json!({
                "type": "verification_update",
                "status": "pending",
                "submittedAt": record.created_at.to_rfc3339(),
            })),
        ),
    )
    .await;

    Ok(Json(VerificationActionResponse {
        message: "Verification submitted. Status: pending".to_string(),
        sms_status,
        notification_result,
    }))
}

/// Get verification status
#[tracing::instrument(name = "http.verification_status", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn verification_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<VerificationStatusResponse>> {
    let Some(record) = state
        .stores
        .verifications
        .find_by_user(&claims.sub)
        .await?
    else {
        return Ok(Json(VerificationStatusResponse {
            status: "not_submitted".to_string(),
            data: None,
            approved_at: None,
        }));
    };

    let approved_at = match record.status {
        VerificationStatus::Approved => record.approved_at,
        _ => None,
    };

    Ok(Json(VerificationStatusResponse {
        status: record.status.as_str().to_string(),
        approved_at,
        data: Some(record),
    }))
}

/// Admin route: approve a user's verification
#[tracing::instrument(name = "http.approve_verification", skip(state), fields(user_id = %user_id))]
pub async fn approve_verification(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VerificationActionResponse>> {
    let record = state.stores.verifications.approve(&user_id).await?;

    let sms_status = send_sms(
        &state,
        &record.phone,
        &format!(
            "Hi {}, your verification has been approved successfully.",
            record.name
        ),
    )
    .await;

    let approved_at = record
        .approved_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339();
    let notification_result = notify_user(
        &state,
        &record.user_id,
        PushMessage::new(
            "Verification Approved",
            "Your profile has been successfully verified!",
            Some(json!({
                "type": "verification_update",
                "status": "approved",
                "approvedAt": approved_at,
            })),
        ),
    )
    .await;

    Ok(Json(VerificationActionResponse {
        message: "Verification approved".to_string(),
        sms_status,
        notification_result,
    }))
}

/// Contained SMS send; failures surface in the response body only
async fn send_sms(state: &AppState, phone: &str, body: &str) -> String {
    let to = normalize_phone(phone, &state.settings.sms.country_prefix);
    match state.sms.send(&to, body).await {
        Ok(()) => "sent".to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "Verification SMS failed");
            "failed".to_string()
        }
    }
}
