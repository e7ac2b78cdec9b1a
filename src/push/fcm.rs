//! Firebase Cloud Messaging adapter.
//!
//! FCM takes exactly one message per wire call, so a batch here is a set of
//! independent sends. Calls run with bounded concurrency and unspecified
//! completion order; one token's failure never touches its siblings.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;

use crate::config::FcmConfig;
use crate::metrics;

use super::types::{PushMessage, TransportError};

/// Maximum number of in-flight FCM calls per batch
const MAX_CONCURRENT_SENDS: usize = 16;

/// Wire shape of one FCM send request
#[derive(Debug, Clone, Serialize)]
pub struct FcmPushMessage {
    pub to: String,
    pub notification: FcmNotification,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait FcmTransport: Send + Sync {
    /// Issue one wire call for one message; returns the gateway's parsed
    /// JSON response verbatim
    async fn send(&self, message: &FcmPushMessage) -> Result<Value, TransportError>;
}

/// Production transport against the FCM HTTP gateway
pub struct HttpFcmTransport {
    client: reqwest::Client,
    api_url: String,
    server_key: String,
}

impl HttpFcmTransport {
    pub fn new(config: &FcmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            server_key: config.server_key.clone(),
        }
    }
}

#[async_trait]
impl FcmTransport for HttpFcmTransport {
    async fn send(&self, message: &FcmPushMessage) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// Per-token sender for the FCM channel
#[derive(Clone)]
pub struct FcmChannel {
    transport: Arc<dyn FcmTransport>,
}

impl FcmChannel {
    pub fn new(transport: Arc<dyn FcmTransport>) -> Self {
        Self { transport }
    }

    /// Send `message` to every token, one wire call per token.
    ///
    /// Returns one `(token, result)` pair per token; completion order is
    /// unspecified and one failure never aborts the remaining sends.
    pub async fn send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Vec<(String, Result<Value, TransportError>)> {
        stream::iter(tokens.iter().cloned())
            .map(|token| {
                let transport = self.transport.clone();
                let wire = FcmPushMessage {
                    to: token.clone(),
                    notification: FcmNotification {
                        title: message.title.clone(),
                        body: message.body.clone(),
                    },
                    data: message.data.clone(),
                };
                async move {
                    metrics::FCM_CALLS_TOTAL.inc();
                    let result = transport.send(&wire).await;
                    if let Err(ref err) = result {
                        tracing::warn!(error = %err, "FCM send failed");
                    }
                    (token, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SENDS)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail_tokens: Vec<String>,
    }

    #[async_trait]
    impl FcmTransport for RecordingTransport {
        async fn send(&self, message: &FcmPushMessage) -> Result<Value, TransportError> {
            self.sent.lock().unwrap().push(message.to.clone());
            if self.fail_tokens.contains(&message.to) {
                return Err(TransportError::Network("connection reset".to_string()));
            }
            Ok(json!({"name": format!("messages/{}", message.to)}))
        }
    }

    #[tokio::test]
    async fn test_one_call_per_token() {
        let transport = Arc::new(RecordingTransport::default());
        let channel = FcmChannel::new(transport.clone());

        let tokens: Vec<String> = (0..25).map(|i| format!("fcm-{}", i)).collect();
        let results = channel
            .send(&tokens, &PushMessage::new("T", "B", None))
            .await;

        assert_eq!(results.len(), 25);
        assert_eq!(transport.sent.lock().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_failed_token_does_not_abort_siblings() {
        let transport = Arc::new(RecordingTransport {
            fail_tokens: vec!["fcm-bad".to_string()],
            ..Default::default()
        });
        let channel = FcmChannel::new(transport.clone());

        let tokens = vec![
            "fcm-good".to_string(),
            "fcm-bad".to_string(),
            "fcm-also-good".to_string(),
        ];
        let results = channel
            .send(&tokens, &PushMessage::new("T", "B", None))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|(_, r)| r.is_err()).count(), 1);
        assert_eq!(transport.sent.lock().unwrap().len(), 3);
    }
}
