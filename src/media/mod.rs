//! Document blob storage capability.
//!
//! KYC uploads go to a Cloudinary-style media API; the handler only needs
//! the public URL back.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::MediaConfig;

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("blob upload failed: {0}")]
    Upload(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload one document, returning its public URL
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, MediaError>;
}

/// Unsigned multipart upload against a Cloudinary-style media API
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: MediaConfig,
}

impl CloudinaryStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for CloudinaryStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, MediaError> {
        let url = format!("{}/{}/auto/upload", self.config.api_url, self.config.cloud_name);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", self.config.folder.clone())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MediaError::Upload(format!("{}: {}", status.as_u16(), detail)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        body.get("secure_url")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| MediaError::Upload("response missing secure_url".to_string()))
    }
}
