//! Expo push gateway adapter.
//!
//! The gateway accepts a JSON array of messages per request, capped at 100
//! entries, and answers with one receipt per message in request order. The
//! adapter owns the chunking; the wire call itself sits behind
//! [`ExpoTransport`] so tests can substitute a recording double.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ExpoConfig;
use crate::metrics;

use super::types::{PushMessage, TransportError};

/// Provider-documented maximum number of messages per request
pub const EXPO_BATCH_LIMIT: usize = 100;

/// Wire shape of one entry in an Expo push request
#[derive(Debug, Clone, Serialize)]
pub struct ExpoPushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[async_trait]
pub trait ExpoTransport: Send + Sync {
    /// Issue one wire call for a batch of at most [`EXPO_BATCH_LIMIT`]
    /// messages; returns the gateway's parsed JSON response verbatim
    async fn push(&self, batch: &[ExpoPushMessage]) -> Result<Value, TransportError>;
}

/// Production transport against the Expo HTTP gateway
pub struct HttpExpoTransport {
    client: reqwest::Client,
    api_url: String,
}

impl HttpExpoTransport {
    pub fn new(config: &ExpoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl ExpoTransport for HttpExpoTransport {
    async fn push(&self, batch: &[ExpoPushMessage]) -> Result<Value, TransportError> {
        let response = self.client.post(&self.api_url).json(batch).send().await?;

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

/// Chunked batch sender for the Expo channel
#[derive(Clone)]
pub struct ExpoChannel {
    transport: Arc<dyn ExpoTransport>,
}

impl ExpoChannel {
    pub fn new(transport: Arc<dyn ExpoTransport>) -> Self {
        Self { transport }
    }

    /// Send `message` to every token, one wire call per chunk of at most
    /// [`EXPO_BATCH_LIMIT`] tokens, preserving input order.
    ///
    /// Returns one result per chunk. A failed chunk is captured as its own
    /// result and never aborts the chunks after it.
    pub async fn send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Vec<Result<Value, TransportError>> {
        let mut results = Vec::with_capacity(tokens.len().div_ceil(EXPO_BATCH_LIMIT));

        for chunk in tokens.chunks(EXPO_BATCH_LIMIT) {
            let batch: Vec<ExpoPushMessage> = chunk
                .iter()
                .map(|token| ExpoPushMessage {
                    to: token.clone(),
                    sound: "default".to_string(),
                    title: message.title.clone(),
                    body: message.body.clone(),
                    data: message.data.clone(),
                })
                .collect();

            metrics::EXPO_CALLS_TOTAL.inc();
            match self.transport.push(&batch).await {
                Ok(response) => results.push(Ok(response)),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        chunk_size = batch.len(),
                        "Expo chunk send failed"
                    );
                    results.push(Err(err));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// Records every batch and fails the chunk indexes it is told to
    #[derive(Default)]
    struct RecordingTransport {
        batches: Mutex<Vec<Vec<String>>>,
        fail_chunks: Vec<usize>,
    }

    #[async_trait]
    impl ExpoTransport for RecordingTransport {
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

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("ExponentPushToken[{}]", i)).collect()
    }

    #[tokio::test]
    async fn test_chunk_count_is_ceil_of_batch_limit() {
        let transport = Arc::new(RecordingTransport::default());
        let channel = ExpoChannel::new(transport.clone());

        let results = channel
            .send(&tokens(250), &PushMessage::new("T", "B", None))
            .await;

        assert_eq!(results.len(), 3);
        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 100);
        assert_eq!(batches[1].len(), 100);
        assert_eq!(batches[2].len(), 50);
    }

    #[tokio::test]
    async fn test_chunks_preserve_token_order() {
        let transport = Arc::new(RecordingTransport::default());
        let channel = ExpoChannel::new(transport.clone());

        let all = tokens(150);
        channel.send(&all, &PushMessage::new("T", "B", None)).await;

        let batches = transport.batches.lock().unwrap();
        let replayed: Vec<String> = batches.iter().flatten().cloned().collect();
        assert_eq!(replayed, all);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort_later_chunks() {
        let transport = Arc::new(RecordingTransport {
            fail_chunks: vec![0],
            ..Default::default()
        });
        let channel = ExpoChannel::new(transport.clone());

        let results = channel
            .send(&tokens(150), &PushMessage::new("T", "B", None))
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
        assert_eq!(transport.batches.lock().unwrap().len(), 2);
    }
}
