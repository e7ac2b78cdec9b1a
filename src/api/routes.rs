use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::server::{admin_gate, AppState};

use super::auth::{check_session, request_otp, verify_otp, verify_token};
use super::feedback::submit_feedback;
use super::health::{health, stats};
use super::kyc::{kyc_status, submit_kyc, update_kyc_status};
use super::meta::{latest_version, stations_meta};
use super::metrics::prometheus_metrics;
use super::notifications::{
    list_users, save_push_token, send_notification, send_specific, send_to_all,
};
use super::stations::{list_station_reports, report_missing_station, update_station_report};
use super::verification::{approve_verification, submit_verification, verification_status};

pub fn api_routes(state: AppState) -> Router<AppState> {
    let admin = middleware::from_fn_with_state(state, admin_gate);

    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // OTP login & sessions
        .nest(
            "/auth",
            Router::new()
                .route("/request-otp", post(request_otp))
                .route("/verify-otp", post(verify_otp))
                .route("/check", get(check_session))
                .route("/verify-token", get(verify_token)),
        )
        // Verification
        .nest(
            "/user",
            Router::new()
                .route("/submit", post(submit_verification))
                .route("/status", get(verification_status))
                .route(
                    "/approve/{user_id}",
                    post(approve_verification).layer(admin.clone()),
                ),
        )
        // Notifications, KYC, stations, feedback, metadata
        .nest(
            "/api",
            Router::new()
                .route("/save-push-token", post(save_push_token))
                .route("/send-notification", post(send_notification))
                .route("/send-to-all", post(send_to_all))
                .route("/send-specific", post(send_specific))
                .route("/users", get(list_users).layer(admin.clone()))
                .route("/kyc/submit", post(submit_kyc))
                .route("/kyc/status", get(kyc_status))
                .route(
                    "/kyc/{id}/status",
                    patch(update_kyc_status).layer(admin.clone()),
                )
                .route("/stations/report-missing", post(report_missing_station))
                .route(
                    "/stations/missing/all",
                    get(list_station_reports).layer(admin.clone()),
                )
                .route(
                    "/stations/missing/{id}/status",
                    patch(update_station_report).layer(admin),
                )
                .route("/stations-meta", get(stations_meta))
                .route("/get-latest-version", get(latest_version))
                .route("/feedback/submit", post(submit_feedback)),
        )
}
