//! MongoDB store backend.
//!
//! One typed collection per record kind. Token registration uses
//! `$addToSet` so concurrent registrations for the same user cannot lose
//! updates; everything else is plain document reads and replaces.

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};

use crate::config::StoreConfig;
use crate::push::ChannelKind;

use super::{
    KycRecord, KycStatus, KycStore, OtpChallenge, StationReportRecord, StationReportStatus,
    StationReportStore, StoreError, TokenSets, UserRecord, UserStore, VerificationRecord,
    VerificationStatus, VerificationStore,
};

pub struct MongoStore {
    users: Collection<UserRecord>,
    verifications: Collection<VerificationRecord>,
    kyc: Collection<KycRecord>,
    station_reports: Collection<StationReportRecord>,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(&config.mongo_uri)
            .await
            .map_err(unavailable)?;
        let client = Client::with_options(options).map_err(unavailable)?;
        let database = client.database(&config.database);

        let store = Self {
            users: database.collection("users"),
            verifications: database.collection("verifications"),
            kyc: database.collection("kyc"),
            station_reports: database.collection("station_reports"),
        };
        store.ensure_indexes().await?;

        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(Some("uid_email".to_string()))
                    .build(),
            )
            .build();
        self.users
            .create_index(email_index, None::<mongodb::options::CreateIndexOptions>)
            .await
            .map_err(unavailable)?;

        let verification_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(Some("uid_verification_user".to_string()))
                    .build(),
            )
            .build();
        self.verifications
            .create_index(verification_index, None::<mongodb::options::CreateIndexOptions>)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

fn unavailable(err: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.users
            .find_one(doc! { "id": id }, None)
            .await
            .map_err(unavailable)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.users
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(unavailable)
    }

    async fn upsert(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut update = doc! {
            "$setOnInsert": {
                "id": &user.id,
                "email": &user.email,
                "expo_push_tokens": [],
                "fcm_tokens": [],
            },
        };
        if let Some(ref name) = user.name {
            update.insert("$set", doc! { "name": name });
        }

        let options = UpdateOptions::builder().upsert(true).build();
        self.users
            .update_one(doc! { "email": &user.email }, update, options)
            .await
            .map_err(unavailable)?;

        self.find_by_email(&user.email)
            .await?
            .ok_or_else(|| StoreError::Unavailable("upserted user vanished".to_string()))
    }

    async fn set_otp(&self, email: &str, otp: Option<OtpChallenge>) -> Result<(), StoreError> {
        let update = match otp {
            Some(challenge) => {
                let value = mongodb::bson::to_bson(&challenge)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                doc! { "$set": { "otp": value } }
            }
            None => doc! { "$unset": { "otp": "" } },
        };

        let result = self
            .users
            .update_one(doc! { "email": email }, update, None)
            .await
            .map_err(unavailable)?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("user {}", email)));
        }
        Ok(())
    }

    async fn register_token(
        &self,
        email: &str,
        channel: ChannelKind,
        token: &str,
    ) -> Result<TokenSets, StoreError> {
        let field = match channel {
            ChannelKind::Expo => "expo_push_tokens",
            ChannelKind::Fcm => "fcm_tokens",
        };

        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$addToSet": { field: token } },
                None,
            )
            .await
            .map_err(unavailable)?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("user {}", email)));
        }

        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", email)))?;
        Ok(user.token_sets())
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let cursor = self.users.find(None, None).await.map_err(unavailable)?;
        cursor.try_collect().await.map_err(unavailable)
    }
}

#[async_trait]
impl VerificationStore for MongoStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<VerificationRecord>, StoreError> {
        self.verifications
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(unavailable)
    }

    async fn create(&self, record: VerificationRecord) -> Result<VerificationRecord, StoreError> {
        self.verifications
            .insert_one(&record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }

    async fn approve(&self, user_id: &str) -> Result<VerificationRecord, StoreError> {
        let mut record = self
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("verification for user {}", user_id)))?;

        let now = Utc::now();
        record.status = VerificationStatus::Approved;
        record.approved_at = Some(now);
        record.updated_at = now;

        self.verifications
            .replace_one(doc! { "user_id": user_id }, &record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }
}

#[async_trait]
impl KycStore for MongoStore {
    async fn create(&self, record: KycRecord) -> Result<KycRecord, StoreError> {
        self.kyc
            .insert_one(&record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }

    async fn latest_by_email(&self, email: &str) -> Result<Option<KycRecord>, StoreError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        self.kyc
            .find_one(doc! { "email": email }, options)
            .await
            .map_err(unavailable)
    }

    async fn update_status(&self, id: &str, status: KycStatus) -> Result<KycRecord, StoreError> {
        let mut record = self
            .kyc
            .find_one(doc! { "id": id }, None)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(format!("kyc {}", id)))?;

        record.status = status;
        record.updated_at = Utc::now();

        self.kyc
            .replace_one(doc! { "id": id }, &record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }
}

#[async_trait]
impl StationReportStore for MongoStore {
    async fn create(
        &self,
        record: StationReportRecord,
    ) -> Result<StationReportRecord, StoreError> {
        self.station_reports
            .insert_one(&record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }

    async fn all(&self) -> Result<Vec<StationReportRecord>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .station_reports
            .find(None, options)
            .await
            .map_err(unavailable)?;
        cursor.try_collect().await.map_err(unavailable)
    }

    async fn update_status(
        &self,
        id: &str,
        status: StationReportStatus,
        admin_note: Option<String>,
    ) -> Result<StationReportRecord, StoreError> {
        let mut record = self
            .station_reports
            .find_one(doc! { "id": id }, None)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(format!("station report {}", id)))?;

        record.status = status;
        if admin_note.is_some() {
            record.admin_note = admin_note;
        }
        record.updated_at = Utc::now();

        self.station_reports
            .replace_one(doc! { "id": id }, &record, None)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }
}
