//! # Cloudinary Uploads
//!
//! Signed image uploads through the Cloudinary upload API.

use crate::config::CloudinaryConfig;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use shop_core::{ImageStore, ImageUpload, ShopError, ShopResult, UploadedImage};
use tracing::{debug, error, info, instrument};

/// Cloudinary image store
pub struct CloudinaryImageStore {
    config: CloudinaryConfig,
    client: Client,
}

impl CloudinaryImageStore {
    /// Create a new Cloudinary image store
    pub fn new(config: CloudinaryConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(CloudinaryConfig::from_env())
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    /// Parameters covered by the signature, in signing order
    fn signed_params(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp.to_string()),
            ("transformation", self.config.transformation.clone()),
        ];
        params.retain(|(_, v)| !v.is_empty());
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    #[instrument(skip(self, image), fields(file = %image.file_name, bytes = image.bytes.len()))]
    async fn upload(&self, image: &ImageUpload) -> ShopResult<UploadedImage> {
        if !self.config.is_configured() {
            return Err(ShopError::Configuration(
                "CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set".to_string(),
            ));
        }

        let params = self.signed_params(Utc::now().timestamp());
        let signature = sign_params(&params, &self.config.api_secret);

        let file = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| ShopError::ImageService(format!("invalid content type: {}", e)))?;

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .part("file", file);
        for (key, value) in params {
            form = form.text(key, value);
        }

        debug!("Uploading image to Cloudinary");

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ShopError::ImageService(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::ImageService(e.to_string()))?;

        if !status.is_success() {
            error!("Cloudinary API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<CloudinaryErrorResponse>(&body) {
                return Err(ShopError::ImageService(error_response.error.message));
            }

            return Err(ShopError::ImageService(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: CloudinaryUploadResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::ImageService(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        info!(
            "Uploaded image: public_id={}, url={}",
            uploaded.public_id, uploaded.secure_url
        );

        Ok(UploadedImage {
            url: uploaded.secure_url,
            name: uploaded.public_id,
        })
    }

    fn provider_name(&self) -> &'static str {
        "cloudinary"
    }
}

// =============================================================================
// Cloudinary API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorResponse {
    error: CloudinaryError,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    message: String,
}

// =============================================================================
// Request Signing
// =============================================================================

/// `sha256("k1=v1&k2=v2" + secret)` over params already sorted by key
fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
