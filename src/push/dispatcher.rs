//! Notification dispatch orchestrator.
//!
//! A dispatch call resolves its targets against the user store, splits each
//! recipient's registered tokens across the Expo and FCM adapters, runs the
//! sends, and folds every per-attempt outcome into one report. Channel
//! failures stay inside the report; the only hard failures are request
//! validation, an unknown single-target user, and a store outage while
//! resolving targets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::store::{UserRecord, UserStore};

use super::expo::ExpoChannel;
use super::fcm::FcmChannel;
use super::types::{
    ChannelKind, DispatchOutcome, DispatchReport, DispatchRequest, PushMessage, TargetedMessage,
};

/// Counters for dispatcher activity
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total dispatch calls
    pub total_dispatches: AtomicU64,
    /// Broadcast dispatch calls
    pub broadcasts: AtomicU64,
    /// Per-attempt outcomes that succeeded
    pub outcomes_delivered: AtomicU64,
    /// Per-attempt outcomes captured as failures
    pub outcomes_failed: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatches: self.total_dispatches.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            outcomes_delivered: self.outcomes_delivered.load(Ordering::Relaxed),
            outcomes_failed: self.outcomes_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_dispatches: u64,
    pub broadcasts: u64,
    pub outcomes_delivered: u64,
    pub outcomes_failed: u64,
}

/// Fans one logical notification out across the registered push channels
pub struct PushDispatcher {
    users: Arc<dyn UserStore>,
    expo: ExpoChannel,
    fcm: FcmChannel,
    stats: DispatcherStats,
}

impl PushDispatcher {
    pub fn new(users: Arc<dyn UserStore>, expo: ExpoChannel, fcm: FcmChannel) -> Self {
        Self {
            users,
            expo,
            fcm,
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch a notification to the request's target(s).
    ///
    /// Stateless single pass: validate, resolve, fan out, aggregate.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, request),
        fields(target = request.target_kind())
    )]
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReport> {
        request.validate()?;

        let target = request.target_kind();
        let report = match request {
            DispatchRequest::User { user_id, message } => {
                self.dispatch_to_user(&user_id, &message).await?
            }
            DispatchRequest::Explicit { entries } => self.dispatch_explicit(entries).await,
            DispatchRequest::Broadcast { message } => {
                self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);
                self.dispatch_broadcast(&message).await?
            }
        };

        self.stats.total_dispatches.fetch_add(1, Ordering::Relaxed);
        self.stats
            .outcomes_delivered
            .fetch_add(report.delivered() as u64, Ordering::Relaxed);
        self.stats
            .outcomes_failed
            .fetch_add(report.failed() as u64, Ordering::Relaxed);

        metrics::DISPATCHES_TOTAL.with_label_values(&[target]).inc();
        metrics::OUTCOMES_DELIVERED_TOTAL.inc_by(report.delivered() as u64);
        metrics::OUTCOMES_FAILED_TOTAL.inc_by(report.failed() as u64);

        tracing::debug!(
            target = target,
            delivered = report.delivered(),
            failed = report.failed(),
            "Dispatch complete"
        );

        Ok(report)
    }

    /// Unknown users are a hard failure here, unlike the explicit-list path
    async fn dispatch_to_user(
        &self,
        user_id: &str,
        message: &PushMessage,
    ) -> Result<DispatchReport> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        let mut report = DispatchReport::default();
        self.fan_out(&user, message, &mut report).await;
        Ok(report)
    }

    /// Each entry resolves independently; a failed lookup becomes an
    /// `Unresolved` outcome and the remaining entries still run
    async fn dispatch_explicit(&self, entries: Vec<TargetedMessage>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for entry in entries {
            match self.users.find_by_id(&entry.user_id).await {
                Ok(Some(user)) => self.fan_out(&user, &entry.message, &mut report).await,
                Ok(None) => report.outcomes.push(DispatchOutcome::Unresolved {
                    user_id: entry.user_id,
                    error: "User not found".to_string(),
                }),
                Err(err) => {
                    tracing::warn!(
                        user_id = %entry.user_id,
                        error = %err,
                        "Skipping explicit entry, user lookup failed"
                    );
                    report.outcomes.push(DispatchOutcome::Unresolved {
                        user_id: entry.user_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Users with no registered tokens contribute zero outcomes
    async fn dispatch_broadcast(&self, message: &PushMessage) -> Result<DispatchReport> {
        let users = self.users.all_users().await?;

        let mut report = DispatchReport::default();
        for user in &users {
            if !user.has_tokens() {
                continue;
            }
            self.fan_out(user, message, &mut report).await;
        }

        tracing::debug!(
            user_count = users.len(),
            outcome_count = report.outcomes.len(),
            "Broadcast fan-out complete"
        );

        Ok(report)
    }

    /// Split one (user, message) pair across the channels with registered
    /// tokens, tagging every outcome with the user's id
    async fn fan_out(&self, user: &UserRecord, message: &PushMessage, report: &mut DispatchReport) {
        if !user.expo_push_tokens.is_empty() {
            for result in self.expo.send(&user.expo_push_tokens, message).await {
                report.outcomes.push(match result {
                    Ok(data) => DispatchOutcome::Delivered {
                        channel: ChannelKind::Expo,
                        user: Some(user.id.clone()),
                        data,
                    },
                    Err(err) => DispatchOutcome::Failed {
                        channel: ChannelKind::Expo,
                        user: Some(user.id.clone()),
                        error: err.to_string(),
                    },
                });
            }
        }

        if !user.fcm_tokens.is_empty() {
            for (token, result) in self.fcm.send(&user.fcm_tokens, message).await {
                report.outcomes.push(match result {
                    Ok(data) => DispatchOutcome::Delivered {
                        channel: ChannelKind::Fcm,
                        user: Some(user.id.clone()),
                        data,
                    },
                    Err(err) => {
                        tracing::debug!(
                            user_id = %user.id,
                            token = %token,
                            "Recording failed FCM attempt"
                        );
                        DispatchOutcome::Failed {
                            channel: ChannelKind::Fcm,
                            user: Some(user.id.clone()),
                            error: err.to_string(),
                        }
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = DispatcherStats::default();
        stats.total_dispatches.fetch_add(4, Ordering::Relaxed);
        stats.outcomes_delivered.fetch_add(9, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_dispatches, 4);
        assert_eq!(snapshot.outcomes_delivered, 9);
        assert_eq!(snapshot.outcomes_failed, 0);
    }
}
