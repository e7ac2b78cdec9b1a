//! Multi-channel push notification dispatch.
//!
//! One logical notification goes in; per-channel, per-attempt outcomes come
//! back. The orchestrator ([`PushDispatcher`]) resolves recipients through
//! the user store and fans tokens out across the Expo and FCM adapters;
//! no channel's failure ever blocks another.

mod dispatcher;
mod expo;
mod fcm;
mod types;

pub use dispatcher::{DispatcherStats, DispatcherStatsSnapshot, PushDispatcher};
pub use expo::{ExpoChannel, ExpoPushMessage, ExpoTransport, HttpExpoTransport, EXPO_BATCH_LIMIT};
pub use fcm::{FcmChannel, FcmNotification, FcmPushMessage, FcmTransport, HttpFcmTransport};
pub use types::{
    ChannelKind, DispatchOutcome, DispatchReport, DispatchRequest, PushMessage, TargetedMessage,
    TransportError,
};
