//! Dispatcher integration tests
//!
//! These tests run the real dispatcher against the in-memory store and
//! recording channel transports, so every provider call and its payload
//! can be asserted without network access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use voltq_backend::error::AppError;
use voltq_backend::push::{
    ChannelKind, DispatchOutcome, DispatchRequest, ExpoChannel, ExpoPushMessage, ExpoTransport,
    FcmChannel, FcmPushMessage, FcmTransport, PushDispatcher, PushMessage, TargetedMessage,
    TransportError,
};
use voltq_backend::store::{MemoryStore, UserRecord, UserStore};

/// Records every Expo batch (as token lists) and optionally fails chunks
#[derive(Default)]
struct RecordingExpo {
    batches: Mutex<Vec<Vec<String>>>,
    fail_chunks: Vec<usize>,
}

#[async_trait]
impl ExpoTransport for RecordingExpo {
    async fn push(&self, batch: &[ExpoPushMessage]) -> Result<Value, TransportError> {
        let mut batches = self.batches.lock().unwrap();
        let index = batches.len();
        batches.push(batch.iter().map(|m| m.to.clone()).collect());

        if self.fail_chunks.contains(&index) {
            return Err(TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(json!({"data": batch.len()}))
    }
}

/// Records every FCM token sent and optionally fails specific tokens
#[derive(Default)]
struct RecordingFcm {
    sent: Mutex<Vec<String>>,
    fail_tokens: Vec<String>,
}

#[async_trait]
impl FcmTransport for RecordingFcm {
    async fn send(&self, message: &FcmPushMessage) -> Result<Value, TransportError> {
        self.sent.lock().unwrap().push(message.to.clone());
        if self.fail_tokens.contains(&message.to) {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        Ok(json!({"name": format!("messages/{}", message.to)}))
    }
}

struct TestEnvironment {
    store: Arc<MemoryStore>,
    expo: Arc<RecordingExpo>,
    fcm: Arc<RecordingFcm>,
    dispatcher: PushDispatcher,
}

fn create_test_environment(expo: RecordingExpo, fcm: RecordingFcm) -> TestEnvironment {
    let store = Arc::new(MemoryStore::new());
    let expo = Arc::new(expo);
    let fcm = Arc::new(fcm);
    let dispatcher = PushDispatcher::new(
        store.clone(),
        ExpoChannel::new(expo.clone()),
        FcmChannel::new(fcm.clone()),
    );

    TestEnvironment {
        store,
        expo,
        fcm,
        dispatcher,
    }
}

fn user_with_tokens(email: &str, expo: &[&str], fcm: &[&str]) -> UserRecord {
    let mut user = UserRecord::new(email, None);
    user.expo_push_tokens = expo.iter().map(|t| t.to_string()).collect();
    user.fcm_tokens = fcm.iter().map(|t| t.to_string()).collect();
    user
}

fn message(title: &str, body: &str) -> PushMessage {
    PushMessage::new(title, body, Some(json!({"type": "test"})))
}

// =============================================================================
// Single-user dispatch
// =============================================================================

mod single_user {
    use super::*;

    #[tokio::test]
    async fn test_user_with_no_tokens_yields_zero_outcomes_and_no_calls() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let user = env
            .store
            .upsert(UserRecord::new("quiet@example.com", None))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: user.id,
                message: message("T", "B"),
            })
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(env.expo.batches.lock().unwrap().is_empty());
        assert!(env.fcm.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_a_hard_not_found() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());

        let err = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: "missing".to_string(),
                message: message("T", "B"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_both_channels_fan_out_for_one_user() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let user = env
            .store
            .upsert(user_with_tokens("rider@example.com", &["a", "b"], &["c"]))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: user.id.clone(),
                message: message("T", "B"),
            })
            .await
            .unwrap();

        // One Expo chunk for [a, b] plus one FCM call for c
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.delivered(), 2);
        assert!(report.outcomes.iter().all(|o| o.user() == Some(user.id.as_str())));

        let batches = env.expo.batches.lock().unwrap();
        assert_eq!(batches.as_slice(), &[vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(env.fcm.sent.lock().unwrap().as_slice(), &["c".to_string()]);
    }

    #[tokio::test]
    async fn test_expo_chunking_is_ceil_and_order_preserving() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let tokens: Vec<String> = (0..250).map(|i| format!("tok-{}", i)).collect();
        let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let user = env
            .store
            .upsert(user_with_tokens("bulk@example.com", &token_refs, &[]))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: user.id,
                message: message("T", "B"),
            })
            .await
            .unwrap();

        // ceil(250 / 100) chunks, concatenating in order reproduces the input
        assert_eq!(report.outcomes.len(), 3);
        let batches = env.expo.batches.lock().unwrap();
        assert_eq!(batches.len(), 3);
        let replayed: Vec<String> = batches.iter().flatten().cloned().collect();
        assert_eq!(replayed, tokens);
    }

    #[tokio::test]
    async fn test_fcm_makes_one_call_per_token() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let tokens: Vec<String> = (0..12).map(|i| format!("fcm-{}", i)).collect();
        let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let user = env
            .store
            .upsert(user_with_tokens("devices@example.com", &[], &token_refs))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: user.id,
                message: message("T", "B"),
            })
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 12);
        let mut sent = env.fcm.sent.lock().unwrap().clone();
        sent.sort();
        let mut expected = tokens.clone();
        expected.sort();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_partial_channel_failure_stays_inside_the_report() {
        let env = create_test_environment(
            RecordingExpo::default(),
            RecordingFcm {
                fail_tokens: vec!["fcm-bad".to_string()],
                ..Default::default()
            },
        );
        let user = env
            .store
            .upsert(user_with_tokens(
                "flaky@example.com",
                &["expo-ok"],
                &["fcm-bad", "fcm-ok"],
            ))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::User {
                user_id: user.id,
                message: message("T", "B"),
            })
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 1);
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_blank_body_fails_fast_with_no_provider_calls() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        env.store
            .upsert(user_with_tokens("rider@example.com", &["a"], &[]))
            .await
            .unwrap();

        let err = env
            .dispatcher
            .dispatch(DispatchRequest::Broadcast {
                message: message("Title", "   "),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(env.expo.batches.lock().unwrap().is_empty());
        assert!(env.fcm.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_explicit_entry_fails_the_whole_request_before_io() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let user = env
            .store
            .upsert(user_with_tokens("rider@example.com", &["a"], &[]))
            .await
            .unwrap();

        let err = env
            .dispatcher
            .dispatch(DispatchRequest::Explicit {
                entries: vec![
                    TargetedMessage {
                        user_id: user.id,
                        message: message("Fine", "Fine"),
                    },
                    TargetedMessage {
                        user_id: "anyone".to_string(),
                        message: message("", "missing title"),
                    },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(env.expo.batches.lock().unwrap().is_empty());
    }
}

// =============================================================================
// Explicit-list dispatch
// =============================================================================

mod explicit_list {
    use super::*;

    #[tokio::test]
    async fn test_unknown_entry_is_recorded_and_does_not_block_siblings() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        let known = env
            .store
            .upsert(user_with_tokens("known@example.com", &["tok"], &[]))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::Explicit {
                entries: vec![
                    TargetedMessage {
                        user_id: "ghost".to_string(),
                        message: message("T", "B"),
                    },
                    TargetedMessage {
                        user_id: known.id.clone(),
                        message: message("T", "B"),
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(matches!(
            &report.outcomes[0],
            DispatchOutcome::Unresolved { user_id, .. } if user_id == "ghost"
        ));
        assert!(report.outcomes[1].is_delivered());
        assert_eq!(report.outcomes[1].user(), Some(known.id.as_str()));
        assert_eq!(env.expo.batches.lock().unwrap().len(), 1);
    }
}

// =============================================================================
// Broadcast dispatch
// =============================================================================

mod broadcast {
    use super::*;

    #[tokio::test]
    async fn test_tokenless_users_are_silently_skipped() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        env.store
            .upsert(UserRecord::new("u1@example.com", None))
            .await
            .unwrap();
        let u2 = env
            .store
            .upsert(user_with_tokens("u2@example.com", &["only-token"], &[]))
            .await
            .unwrap();

        let report = env
            .dispatcher
            .dispatch(DispatchRequest::Broadcast {
                message: message("T", "B"),
            })
            .await
            .unwrap();

        // Exactly one provider call total, and no outcome mentions u1
        assert_eq!(env.expo.batches.lock().unwrap().len(), 1);
        assert!(env.fcm.sent.lock().unwrap().is_empty());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].user(), Some(u2.id.as_str()));
    }

    #[tokio::test]
    async fn test_broadcast_stats_accumulate() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        env.store
            .upsert(user_with_tokens("u@example.com", &["tok"], &[]))
            .await
            .unwrap();

        for _ in 0..3 {
            env.dispatcher
                .dispatch(DispatchRequest::Broadcast {
                    message: message("T", "B"),
                })
                .await
                .unwrap();
        }

        let stats = env.dispatcher.stats();
        assert_eq!(stats.total_dispatches, 3);
        assert_eq!(stats.broadcasts, 3);
        assert_eq!(stats.outcomes_delivered, 3);
        assert_eq!(stats.outcomes_failed, 0);
    }
}

// =============================================================================
// Token registry
// =============================================================================

mod token_registry {
    use super::*;

    #[tokio::test]
    async fn test_registering_same_token_twice_is_idempotent() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        env.store
            .upsert(UserRecord::new("rider@example.com", None))
            .await
            .unwrap();

        env.store
            .register_token("rider@example.com", ChannelKind::Expo, "tok-1")
            .await
            .unwrap();
        let sets = env
            .store
            .register_token("rider@example.com", ChannelKind::Expo, "tok-1")
            .await
            .unwrap();

        assert_eq!(sets.expo.len(), 1);
    }

    #[tokio::test]
    async fn test_channels_are_partitioned_per_user() {
        let env = create_test_environment(RecordingExpo::default(), RecordingFcm::default());
        env.store
            .upsert(UserRecord::new("rider@example.com", None))
            .await
            .unwrap();

        env.store
            .register_token("rider@example.com", ChannelKind::Expo, "expo-tok")
            .await
            .unwrap();
        let sets = env
            .store
            .register_token("rider@example.com", ChannelKind::Fcm, "fcm-tok")
            .await
            .unwrap();

        assert_eq!(sets.expo, vec!["expo-tok".to_string()]);
        assert_eq!(sets.fcm, vec!["fcm-tok".to_string()]);
    }
}
