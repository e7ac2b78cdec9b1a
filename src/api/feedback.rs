//! Feedback intake, relayed to the team inbox by mail.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::mail::{feedback_email_html, OutboundMail};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub comment: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

/// Submit feedback
#[tracing::instrument(name = "http.submit_feedback", skip(state, request), fields(rating = request.rating))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>> {
    if !(1..=5).contains(&request.rating) || request.comment.trim().is_empty() {
        return Err(AppError::Validation(
            "Rating and comment are required".to_string(),
        ));
    }

    state
        .mailer
        .send(OutboundMail {
            to: state.settings.email.feedback_recipient.clone(),
            subject: "New Feedback Submission - VoltQ".to_string(),
            html: feedback_email_html(
                request.rating,
                request.comment.trim(),
                request.name.as_deref(),
                request.email.as_deref(),
            ),
        })
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send feedback mail: {}", e)))?;

    Ok(Json(FeedbackResponse {
        success: true,
        message: "Feedback submitted and email sent successfully".to_string(),
    }))
}
