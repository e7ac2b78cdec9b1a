//! In-memory store backend using DashMap.
//!
//! Records live in process memory and are lost on restart. This backend
//! serves tests and local development; per-entry DashMap guards give the
//! same append-if-absent atomicity for token registration that the Mongo
//! backend gets from `$addToSet`.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::push::ChannelKind;

use super::{
    KycRecord, KycStatus, KycStore, OtpChallenge, StationReportRecord, StationReportStatus,
    StationReportStore, StoreError, TokenSets, UserRecord, UserStore, VerificationRecord,
    VerificationStatus, VerificationStore,
};

#[derive(Default)]
pub struct MemoryStore {
    /// Users keyed by id
    users: DashMap<String, UserRecord>,
    /// Verifications keyed by user id (one per user)
    verifications: DashMap<String, VerificationRecord>,
    /// KYC submissions keyed by record id
    kyc: DashMap<String, KycRecord>,
    /// Station reports keyed by record id
    station_reports: DashMap<String, StationReportRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(id).map(|r| r.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|r| r.email == email)
            .map(|r| r.clone()))
    }

    async fn upsert(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        if let Some(mut existing) = self.users.iter_mut().find(|r| r.email == user.email) {
            if user.name.is_some() {
                existing.name = user.name;
            }
            return Ok(existing.clone());
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn set_otp(&self, email: &str, otp: Option<OtpChallenge>) -> Result<(), StoreError> {
        let mut user = self
            .users
            .iter_mut()
            .find(|r| r.email == email)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", email)))?;
        user.otp = otp;
        Ok(())
    }

    async fn register_token(
        &self,
        email: &str,
        channel: ChannelKind,
        token: &str,
    ) -> Result<TokenSets, StoreError> {
        let mut user = self
            .users
            .iter_mut()
            .find(|r| r.email == email)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", email)))?;

        let tokens = match channel {
            ChannelKind::Expo => &mut user.expo_push_tokens,
            ChannelKind::Fcm => &mut user.fcm_tokens,
        };
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }

        Ok(user.token_sets())
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.iter().map(|r| r.clone()).collect())
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.verifications.get(user_id).map(|r| r.clone()))
    }

    async fn create(&self, record: VerificationRecord) -> Result<VerificationRecord, StoreError> {
        self.verifications
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn approve(&self, user_id: &str) -> Result<VerificationRecord, StoreError> {
        let mut record = self
            .verifications
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("verification for user {}", user_id)))?;
        let now = Utc::now();
        record.status = VerificationStatus::Approved;
        record.approved_at = Some(now);
        record.updated_at = now;
        Ok(record.clone())
    }
}

#[async_trait]
impl KycStore for MemoryStore {
    async fn create(&self, record: KycRecord) -> Result<KycRecord, StoreError> {
        self.kyc.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn latest_by_email(&self, email: &str) -> Result<Option<KycRecord>, StoreError> {
        Ok(self
            .kyc
            .iter()
            .filter(|r| r.email == email)
            .max_by_key(|r| r.created_at)
            .map(|r| r.clone()))
    }

    async fn update_status(&self, id: &str, status: KycStatus) -> Result<KycRecord, StoreError> {
        let mut record = self
            .kyc
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("kyc {}", id)))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl StationReportStore for MemoryStore {
    async fn create(
        &self,
        record: StationReportRecord,
    ) -> Result<StationReportRecord, StoreError> {
        self.station_reports
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn all(&self) -> Result<Vec<StationReportRecord>, StoreError> {
        let mut reports: Vec<StationReportRecord> =
            self.station_reports.iter().map(|r| r.clone()).collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn update_status(
        &self,
        id: &str,
        status: StationReportStatus,
        admin_note: Option<String>,
    ) -> Result<StationReportRecord, StoreError> {
        let mut record = self
            .station_reports
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("station report {}", id)))?;
        record.status = status;
        if admin_note.is_some() {
            record.admin_note = admin_note;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_is_keyed_by_email() {
        let store = MemoryStore::new();
        let first = store
            .upsert(UserRecord::new("a@example.com", Some("A".into())))
            .await
            .unwrap();
        let second = store
            .upsert(UserRecord::new("a@example.com", Some("Renamed".into())))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Renamed"));
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_token_dedupes() {
        let store = MemoryStore::new();
        store
            .upsert(UserRecord::new("a@example.com", None))
            .await
            .unwrap();

        store
            .register_token("a@example.com", ChannelKind::Expo, "tok-1")
            .await
            .unwrap();
        let sets = store
            .register_token("a@example.com", ChannelKind::Expo, "tok-1")
            .await
            .unwrap();

        assert_eq!(sets.expo, vec!["tok-1".to_string()]);
        assert!(sets.fcm.is_empty());
    }

    #[tokio::test]
    async fn test_register_token_unknown_user() {
        let store = MemoryStore::new();
        let err = store
            .register_token("ghost@example.com", ChannelKind::Fcm, "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_station_reports_newest_first() {
        let store = MemoryStore::new();
        let first = StationReportStore::create(&store, StationReportRecord::new("u1", "https://maps/1", None))
            .await
            .unwrap();
        let mut later = StationReportRecord::new("u2", "https://maps/2", None);
        later.created_at = first.created_at + chrono::Duration::seconds(5);
        StationReportStore::create(&store, later.clone()).await.unwrap();

        let all = StationReportStore::all(&store).await.unwrap();
        assert_eq!(all[0].id, later.id);
        assert_eq!(all[1].id, first.id);
    }
}
