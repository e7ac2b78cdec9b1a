//! App and station-data version metadata.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct StationsMetaResponse {
    pub meta: StationsMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationsMeta {
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// GET /api/stations-meta
pub async fn stations_meta(State(state): State<AppState>) -> Json<StationsMetaResponse> {
    Json(StationsMetaResponse {
        meta: StationsMeta {
            version: state.settings.app.stations_data_version.clone(),
            updated_at: Utc::now(),
        },
    })
}

/// GET /api/get-latest-version
pub async fn latest_version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.settings.app.latest_version.clone(),
    })
}
