//! Persistence layer for the companion app's document records.
//!
//! Every repository is an `async_trait` object created through
//! [`create_stores`], which selects a backend from configuration. The
//! in-memory backend backs tests and local development; the Mongo backend
//! is the production document store.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::push::ChannelKind;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// One-time password challenge attached to a user while a login is pending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// A registered app user together with their push delivery addresses.
///
/// Token lists are append-only and deduplicated per channel; nothing in the
/// system removes a token once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub otp: Option<OtpChallenge>,
    #[serde(default)]
    pub expo_push_tokens: Vec<String>,
    #[serde(default)]
    pub fcm_tokens: Vec<String>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            name,
            otp: None,
            expo_push_tokens: Vec::new(),
            fcm_tokens: Vec::new(),
        }
    }

    /// Whether the user can be reached on at least one push channel
    pub fn has_tokens(&self) -> bool {
        !self.expo_push_tokens.is_empty() || !self.fcm_tokens.is_empty()
    }

    pub fn token_sets(&self) -> TokenSets {
        TokenSets {
            expo: self.expo_push_tokens.clone(),
            fcm: self.fcm_tokens.clone(),
        }
    }
}

/// Per-channel token sets for one user; empty when none registered, never null
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenSets {
    pub expo: Vec<String>,
    pub fcm: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub aadhar_card: String,
    pub license_id: String,
    pub status: VerificationStatus,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
        aadhar_card: impl Into<String>,
        license_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            phone: phone.into(),
            aadhar_card: aadhar_card.into(),
            license_id: license_id.into(),
            status: VerificationStatus::Pending,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycRecord {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub pin_code: String,
    pub kyc_id_url: String,
    pub address_proof_url: String,
    pub site_photo_url: String,
    pub status: KycStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationReportStatus {
    Pending,
    Accepted,
    Rejected,
}

impl StationReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationReportStatus::Pending => "pending",
            StationReportStatus::Accepted => "accepted",
            StationReportStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationReportRecord {
    pub id: String,
    pub user_id: String,
    pub maps_link: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: StationReportStatus,
    #[serde(default)]
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StationReportRecord {
    pub fn new(
        user_id: impl Into<String>,
        maps_link: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            maps_link: maps_link.into(),
            description,
            status: StationReportStatus::Pending,
            admin_note: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User records and the per-user push token registry
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert the record if no user has its email yet, otherwise refresh the
    /// mutable profile fields; returns the stored record either way
    async fn upsert(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    /// Attach or clear the pending OTP challenge for a user
    async fn set_otp(&self, email: &str, otp: Option<OtpChallenge>) -> Result<(), StoreError>;

    /// Append a push token to the user's set for the given channel.
    ///
    /// Idempotent: registering an already-present token leaves the set
    /// unchanged. Fails with `NotFound` when no user has the email. Returns
    /// the post-registration token sets for both channels.
    async fn register_token(
        &self,
        email: &str,
        channel: ChannelKind,
        token: &str,
    ) -> Result<TokenSets, StoreError>;

    /// Every known user; re-queries the store per call, with no snapshot
    /// guarantee against concurrent registrations
    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<VerificationRecord>, StoreError>;

    async fn create(&self, record: VerificationRecord) -> Result<VerificationRecord, StoreError>;

    /// Mark the user's verification approved, stamping `approved_at`
    async fn approve(&self, user_id: &str) -> Result<VerificationRecord, StoreError>;
}

#[async_trait]
pub trait KycStore: Send + Sync {
    async fn create(&self, record: KycRecord) -> Result<KycRecord, StoreError>;

    /// Most recently submitted KYC for the email, if any
    async fn latest_by_email(&self, email: &str) -> Result<Option<KycRecord>, StoreError>;

    async fn update_status(&self, id: &str, status: KycStatus) -> Result<KycRecord, StoreError>;
}

#[async_trait]
pub trait StationReportStore: Send + Sync {
    async fn create(&self, record: StationReportRecord)
        -> Result<StationReportRecord, StoreError>;

    /// All reports, newest first
    async fn all(&self) -> Result<Vec<StationReportRecord>, StoreError>;

    async fn update_status(
        &self,
        id: &str,
        status: StationReportStatus,
        admin_note: Option<String>,
    ) -> Result<StationReportRecord, StoreError>;
}

/// The full set of repositories backing the application
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub verifications: Arc<dyn VerificationStore>,
    pub kyc: Arc<dyn KycStore>,
    pub station_reports: Arc<dyn StationReportStore>,
}

/// Create the repository set for the configured backend.
///
/// Unknown backend names fall back to the in-memory store with a warning,
/// so a misconfigured deployment still boots in a debuggable state.
pub async fn create_stores(config: &StoreConfig) -> Result<Stores, StoreError> {
    match config.backend.as_str() {
        "mongo" => {
            let store = Arc::new(MongoStore::connect(config).await?);
            tracing::info!(database = %config.database, "Using MongoDB store backend");
            Ok(Stores {
                users: store.clone(),
                verifications: store.clone(),
                kyc: store.clone(),
                station_reports: store,
            })
        }
        other => {
            if other != "memory" {
                tracing::warn!(
                    backend = %other,
                    "Unknown store backend, falling back to memory"
                );
            }
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                users: store.clone(),
                verifications: store.clone(),
                kyc: store.clone(),
                station_reports: store,
            })
        }
    }
}
