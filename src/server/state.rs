use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::config::Settings;
use crate::error::Result;
use crate::mail::{HttpMailer, Mailer};
use crate::media::{BlobStore, CloudinaryStore};
use crate::push::{ExpoChannel, FcmChannel, HttpExpoTransport, HttpFcmTransport, PushDispatcher};
use crate::sms::{SmsSender, TwilioSms};
use crate::store::{create_stores, Stores};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt: Arc<JwtKeys>,
    pub stores: Stores,
    pub dispatcher: Arc<PushDispatcher>,
    pub mailer: Arc<dyn Mailer>,
    pub sms: Arc<dyn SmsSender>,
    pub media: Arc<dyn BlobStore>,
}

impl AppState {
    /// Build production state: configured store backend, HTTP transports
    /// for every provider.
    pub async fn new(settings: Settings) -> Result<Self> {
        let stores = create_stores(&settings.store).await?;

        let expo = ExpoChannel::new(Arc::new(HttpExpoTransport::new(&settings.push.expo)));
        let fcm = FcmChannel::new(Arc::new(HttpFcmTransport::new(&settings.push.fcm)));
        let dispatcher = Arc::new(PushDispatcher::new(stores.users.clone(), expo, fcm));

        let mailer = Arc::new(HttpMailer::new(&settings.email));
        let sms = Arc::new(TwilioSms::new(&settings.sms));
        let media = Arc::new(CloudinaryStore::new(&settings.media));

        Ok(Self::from_parts(
            settings, stores, dispatcher, mailer, sms, media,
        ))
    }

    /// Assemble state from pre-built components; tests use this to swap in
    /// recording doubles for the provider handles
    pub fn from_parts(
        settings: Settings,
        stores: Stores,
        dispatcher: Arc<PushDispatcher>,
        mailer: Arc<dyn Mailer>,
        sms: Arc<dyn SmsSender>,
        media: Arc<dyn BlobStore>,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::new(&settings.jwt));
        Self {
            settings: Arc::new(settings),
            jwt,
            stores,
            dispatcher,
            mailer,
            sms,
            media,
        }
    }
}
