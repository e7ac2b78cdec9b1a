//! Push token registration and notification fan-out endpoints.
//!
//! Send endpoints always answer 200 once the request itself is valid; the
//! caller learns about per-channel failures by inspecting `responses`, not
//! the status code.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::push::{ChannelKind, DispatchOutcome, DispatchRequest, PushMessage, TargetedMessage};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePushTokenRequest {
    pub email: String,
    pub expo_push_token: Option<String>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePushTokenResponse {
    pub message: String,
    pub expo_tokens: Vec<String>,
    pub fcm_tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SendSpecificRequest {
    pub messages: Vec<SpecificMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificMessage {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
}

/// Success envelope for every send endpoint
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub message: String,
    pub responses: Vec<DispatchOutcome>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

/// Save push token (Expo token or FCM token)
#[tracing::instrument(
    name = "http.save_push_token",
    skip(state, request),
    fields(email = %request.email)
)]
pub async fn save_push_token(
    State(state): State<AppState>,
    Json(request): Json<SavePushTokenRequest>,
) -> Result<Json<SavePushTokenResponse>> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let expo_token = request
        .expo_push_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let fcm_token = request
        .fcm_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if expo_token.is_none() && fcm_token.is_none() {
        return Err(AppError::Validation(
            "At least one push token is required".to_string(),
        ));
    }

    if let Some(token) = expo_token {
        state
            .stores
            .users
            .register_token(&request.email, ChannelKind::Expo, token)
            .await?;
    }
    if let Some(token) = fcm_token {
        state
            .stores
            .users
            .register_token(&request.email, ChannelKind::Fcm, token)
            .await?;
    }

    let user = state
        .stores
        .users
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(SavePushTokenResponse {
        message: "Token(s) saved successfully".to_string(),
        expo_tokens: user.expo_push_tokens,
        fcm_tokens: user.fcm_tokens,
    }))
}

/// Send notification to a specific user
#[tracing::instrument(
    name = "http.send_notification",
    skip(state, request),
    fields(user_id = %request.user_id)
)]
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<NotificationResponse>> {
    let report = state
        .dispatcher
        .dispatch(DispatchRequest::User {
            user_id: request.user_id,
            message: PushMessage::new(request.title, request.body, request.data),
        })
        .await?;

    Ok(Json(NotificationResponse {
        message: "Notifications sent".to_string(),
        responses: report.outcomes,
    }))
}

/// Send notification to all known users
#[tracing::instrument(name = "http.send_to_all", skip(state, request))]
pub async fn send_to_all(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<NotificationResponse>> {
    let report = state
        .dispatcher
        .dispatch(DispatchRequest::Broadcast {
            message: PushMessage::new(request.title, request.body, request.data),
        })
        .await?;

    Ok(Json(NotificationResponse {
        message: "Notifications sent to all users".to_string(),
        responses: report.outcomes,
    }))
}

/// Send an independent notification to each listed user
#[tracing::instrument(
    name = "http.send_specific",
    skip(state, request),
    fields(entry_count = request.messages.len())
)]
pub async fn send_specific(
    State(state): State<AppState>,
    Json(request): Json<SendSpecificRequest>,
) -> Result<Json<NotificationResponse>> {
    let entries = request
        .messages
        .into_iter()
        .map(|m| TargetedMessage {
            user_id: m.user_id,
            message: PushMessage::new(m.title, m.body, m.data),
        })
        .collect();

    let report = state
        .dispatcher
        .dispatch(DispatchRequest::Explicit { entries })
        .await?;

    Ok(Json(NotificationResponse {
        message: "Specific notifications sent".to_string(),
        responses: report.outcomes,
    }))
}

/// Admin listing of all registered users
#[tracing::instrument(name = "http.list_users", skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>> {
    let users = state
        .stores
        .users
        .all_users()
        .await?
        .into_iter()
        .map(|u| UserSummary {
            id: u.id,
            name: u.name,
            email: u.email,
        })
        .collect();

    Ok(Json(UsersResponse { users }))
}

/// Dispatch a notification on behalf of another flow, containing any
/// failure so the calling operation never fails on a push problem
pub(crate) async fn notify_user(
    state: &AppState,
    user_id: &str,
    message: PushMessage,
) -> Option<NotificationResponse> {
    let request = DispatchRequest::User {
        user_id: user_id.to_string(),
        message,
    };

    match state.dispatcher.dispatch(request).await {
        Ok(report) => Some(NotificationResponse {
            message: "Notifications sent".to_string(),
            responses: report.outcomes,
        }),
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "Side-channel push failed");
            None
        }
    }
}
