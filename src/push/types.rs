use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{AppError, Result};

/// Push delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Expo,
    Fcm,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Expo => "expo",
            ChannelKind::Fcm => "fcm",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from a single wire call against a push gateway
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

/// Notification content fanned out unchanged to every channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Open-ended metadata forwarded verbatim to the providers
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    serde_json::json!({})
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: data.unwrap_or_else(empty_object),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.body.trim().is_empty() {
            return Err(AppError::Validation(
                "Title and body are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One message addressed to one user within an explicit-list dispatch
#[derive(Debug, Clone)]
pub struct TargetedMessage {
    pub user_id: String,
    pub message: PushMessage,
}

/// Target specification for a dispatch call; constructed per call and
/// consumed once
#[derive(Debug, Clone)]
pub enum DispatchRequest {
    /// Send one message to one user; unknown users are a hard failure
    User { user_id: String, message: PushMessage },
    /// Independent per-user messages; entry failures never abort siblings
    Explicit { entries: Vec<TargetedMessage> },
    /// Send one message to every known user with at least one token
    Broadcast { message: PushMessage },
}

impl DispatchRequest {
    pub fn target_kind(&self) -> &'static str {
        match self {
            DispatchRequest::User { .. } => "user",
            DispatchRequest::Explicit { .. } => "explicit",
            DispatchRequest::Broadcast { .. } => "broadcast",
        }
    }

    /// Reject malformed requests before any store read or provider call
    pub fn validate(&self) -> Result<()> {
        match self {
            DispatchRequest::User { user_id, message } => {
                if user_id.trim().is_empty() {
                    return Err(AppError::Validation("User ID is required".to_string()));
                }
                message.validate()
            }
            DispatchRequest::Explicit { entries } => {
                for entry in entries {
                    if entry.user_id.trim().is_empty() {
                        return Err(AppError::Validation("User ID is required".to_string()));
                    }
                    entry.message.validate()?;
                }
                Ok(())
            }
            DispatchRequest::Broadcast { message } => message.validate(),
        }
    }
}

/// Outcome of one delivery attempt.
///
/// Channel outcomes carry the provider's verbatim response (one per Expo
/// chunk, one per FCM token); `Unresolved` records an explicit-list entry
/// whose user lookup failed. No outcome ever blocks a sibling.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Delivered {
        #[serde(rename = "type")]
        channel: ChannelKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        data: Value,
    },
    Failed {
        #[serde(rename = "type")]
        channel: ChannelKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        error: String,
    },
    Unresolved {
        #[serde(rename = "userId")]
        user_id: String,
        error: String,
    },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }

    pub fn channel(&self) -> Option<ChannelKind> {
        match self {
            DispatchOutcome::Delivered { channel, .. }
            | DispatchOutcome::Failed { channel, .. } => Some(*channel),
            DispatchOutcome::Unresolved { .. } => None,
        }
    }

    /// Originating user, when resolvable
    pub fn user(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Delivered { user, .. } | DispatchOutcome::Failed { user, .. } => {
                user.as_deref()
            }
            DispatchOutcome::Unresolved { user_id, .. } => Some(user_id),
        }
    }
}

/// Ordered per-attempt outcomes of one dispatch call; returned to the
/// caller, never persisted
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_rejects_blank_title() {
        let request = DispatchRequest::User {
            user_id: "u1".to_string(),
            message: PushMessage::new("  ", "body", None),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_checks_every_explicit_entry() {
        let request = DispatchRequest::Explicit {
            entries: vec![
                TargetedMessage {
                    user_id: "u1".to_string(),
                    message: PushMessage::new("Hi", "there", None),
                },
                TargetedMessage {
                    user_id: "u2".to_string(),
                    message: PushMessage::new("Hi", "", None),
                },
            ],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_outcome_wire_shapes() {
        let delivered = DispatchOutcome::Delivered {
            channel: ChannelKind::Expo,
            user: Some("u1".to_string()),
            data: json!({"status": "ok"}),
        };
        let encoded = serde_json::to_value(&delivered).unwrap();
        assert_eq!(encoded["type"], "expo");
        assert_eq!(encoded["user"], "u1");
        assert_eq!(encoded["data"]["status"], "ok");

        let unresolved = DispatchOutcome::Unresolved {
            user_id: "ghost".to_string(),
            error: "User not found".to_string(),
        };
        let encoded = serde_json::to_value(&unresolved).unwrap();
        assert_eq!(encoded["userId"], "ghost");
        assert_eq!(encoded["error"], "User not found");
    }

    #[test]
    fn test_report_counts() {
        let report = DispatchReport {
            outcomes: vec![
                DispatchOutcome::Delivered {
                    channel: ChannelKind::Fcm,
                    user: None,
                    data: json!("id-1"),
                },
                DispatchOutcome::Failed {
                    channel: ChannelKind::Expo,
                    user: None,
                    error: "boom".to_string(),
                },
            ],
        };
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
    }
}
