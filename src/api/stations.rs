//! Missing-station reporting and review.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::push::PushMessage;
use crate::server::AppState;
use crate::store::{StationReportRecord, StationReportStatus};

use super::notifications::notify_user;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMissingRequest {
    pub maps_link: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StationReportResponse {
    pub success: bool,
    pub data: StationReportRecord,
}

#[derive(Debug, Serialize)]
pub struct StationReportListResponse {
    pub success: bool,
    pub data: Vec<StationReportRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportStatusRequest {
    pub status: String,
    pub admin_note: Option<String>,
}

/// Report a charging station missing from the map
#[tracing::instrument(name = "http.report_missing_station", skip(state, claims, request), fields(user_id = %claims.sub))]
pub async fn report_missing_station(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<ReportMissingRequest>,
) -> Result<(StatusCode, Json<StationReportResponse>)> {
    if request.maps_link.trim().is_empty() {
        return Err(AppError::Validation(
            "Google Maps link is required".to_string(),
        ));
    }

    let record = state
        .stores
        .station_reports
        .create(StationReportRecord::new(
            claims.sub.clone(),
            request.maps_link.trim(),
            request.description,
        ))
        .await?;

    notify_user(
        &state,
        &claims.sub,
        PushMessage::new(
            "Station Request Submitted",
            "Thanks! Your station submission is under review.",
            Some(json!({"type": "station_request", "status": "pending"})),
        ),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(StationReportResponse {
            success: true,
            data: record,
        }),
    ))
}

/// Admin listing of every report, newest first
#[tracing::instrument(name = "http.list_station_reports", skip(state))]
pub async fn list_station_reports(
    State(state): State<AppState>,
) -> Result<Json<StationReportListResponse>> {
    let reports = state.stores.station_reports.all().await?;

    Ok(Json(StationReportListResponse {
        success: true,
        data: reports,
    }))
}

/// Admin route: accept or reject a report, notifying the reporter
#[tracing::instrument(name = "http.update_station_report", skip(state, request), fields(report_id = %id))]
pub async fn update_station_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReportStatusRequest>,
) -> Result<Json<StationReportResponse>> {
    let status = match request.status.as_str() {
        "accepted" => StationReportStatus::Accepted,
        "rejected" => StationReportStatus::Rejected,
        _ => return Err(AppError::Validation("Invalid status".to_string())),
    };

    let record = state
        .stores
        .station_reports
        .update_status(&id, status, request.admin_note)
        .await?;

    let (title, body) = match status {
        StationReportStatus::Accepted => (
            "Station Request Approved",
            "Great news! Your submitted station will be added soon.",
        ),
        _ => (
            "Station Request Rejected",
            "Thanks for helping! This location couldn't be verified.",
        ),
    };

    notify_user(
        &state,
        &record.user_id,
        PushMessage::new(
            title,
            body,
            Some(json!({
                "type": "station_request",
                "status": status.as_str(),
            })),
        ),
    )
    .await;

    Ok(Json(StationReportResponse {
        success: true,
        data: record,
    }))
}
