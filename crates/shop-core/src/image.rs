//! # Image Storage
//!
//! Product images live in an external blob service. The service takes the raw
//! upload and hands back a public URL plus the name it stored the blob under.

use crate::error::ShopResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A file received from a client, not yet stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Non-empty and declared as an image
    pub fn is_image(&self) -> bool {
        !self.bytes.is_empty() && self.content_type.starts_with("image/")
    }
}

/// Where the service put an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub name: String,
}

/// Image storage/transformation service
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: &ImageUpload) -> ShopResult<UploadedImage>;

    /// Service name (for logging)
    fn provider_name(&self) -> &'static str;
}

pub type BoxedImageStore = Arc<dyn ImageStore>;
