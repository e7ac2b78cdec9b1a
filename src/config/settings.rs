use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub app: AppMetaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Session lifetime in hours
    #[serde(default = "default_jwt_expiry_hours")]
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Storage backend: "memory" or "mongo"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_mongo_uri")]
    pub mongo_uri: String,
    #[serde(default = "default_database")]
    pub database: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub expo: ExpoConfig,
    #[serde(default)]
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpoConfig {
    #[serde(default = "default_expo_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    #[serde(default = "default_fcm_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub server_key: String,
}

/// HTTP mail relay used for OTP and feedback mail
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub sender: String,
    /// Inbox that receives feedback submissions
    #[serde(default)]
    pub feedback_recipient: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub messaging_service_sid: String,
    /// Prepended to phone numbers submitted without a country code
    #[serde(default = "default_country_prefix")]
    pub country_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub upload_preset: String,
    #[serde(default = "default_media_folder")]
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// OTP lifetime in minutes
    #[serde(default = "default_otp_ttl_minutes")]
    pub ttl_minutes: i64,
    /// Email address that always receives the fixed test code
    pub test_user: Option<String>,
    #[serde(default = "default_test_otp")]
    pub test_code: String,
    #[serde(default = "default_test_otp_ttl_minutes")]
    pub test_ttl_minutes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Shared key expected in the X-Admin-Key header; admin routes reject
    /// every request while this is unset
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppMetaConfig {
    #[serde(default = "default_latest_version")]
    pub latest_version: String,
    #[serde(default = "default_stations_data_version")]
    pub stations_data_version: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_jwt_expiry_hours() -> i64 {
    24
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "voltq".to_string()
}

fn default_expo_api_url() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_fcm_api_url() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

fn default_sms_api_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_country_prefix() -> String {
    "+91".to_string()
}

fn default_media_api_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_media_folder() -> String {
    "kyc_docs".to_string()
}

fn default_otp_ttl_minutes() -> i64 {
    5
}

fn default_test_otp() -> String {
    "123456".to_string()
}

fn default_test_otp_ttl_minutes() -> i64 {
    10
}

fn default_latest_version() -> String {
    "1.5.0".to_string()
}

fn default_stations_data_version() -> String {
    "1".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8001)?
            .set_default("store.backend", "memory")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, STORE_BACKEND, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            mongo_uri: default_mongo_uri(),
            database: default_database(),
        }
    }
}

impl Default for ExpoConfig {
    fn default() -> Self {
        Self {
            api_url: default_expo_api_url(),
        }
    }
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            api_url: default_fcm_api_url(),
            server_key: String::new(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_url: default_sms_api_url(),
            account_sid: String::new(),
            auth_token: String::new(),
            messaging_service_sid: String::new(),
            country_prefix: default_country_prefix(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            api_url: default_media_api_url(),
            cloud_name: String::new(),
            upload_preset: String::new(),
            folder: default_media_folder(),
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_otp_ttl_minutes(),
            test_user: None,
            test_code: default_test_otp(),
            test_ttl_minutes: default_test_otp_ttl_minutes(),
        }
    }
}

impl Default for AppMetaConfig {
    fn default() -> Self {
        Self {
            latest_version: default_latest_version(),
            stations_data_version: default_stations_data_version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8001);

        let expo = ExpoConfig::default();
        assert_eq!(expo.api_url, "https://exp.host/--/api/v2/push/send");

        let otp = OtpConfig::default();
        assert_eq!(otp.ttl_minutes, 5);
        assert_eq!(otp.test_code, "123456");
    }
}
