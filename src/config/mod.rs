mod settings;

pub use settings::{
    AdminConfig, AppMetaConfig, EmailConfig, ExpoConfig, FcmConfig, JwtConfig, MediaConfig,
    OtpConfig, PushConfig, ServerConfig, Settings, SmsConfig, StoreConfig,
};
