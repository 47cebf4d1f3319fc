//! # Cloudinary Configuration
//!
//! Account settings for the upload API, loaded from environment variables
//! with local defaults.

use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";

/// Limit uploads to 500x500, keeping aspect ratio
pub const DEFAULT_TRANSFORMATION: &str = "c_limit,h_500,w_500";

/// Cloudinary API configuration
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Account (cloud) name
    pub cloud_name: String,

    /// API key
    pub api_key: String,

    /// API secret, used only to sign requests
    pub api_secret: String,

    /// Folder uploads are stored under
    pub folder: String,

    /// Incoming transformation applied to every upload
    pub transformation: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("folder", &self.folder)
            .field("transformation", &self.transformation)
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

impl CloudinaryConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CLOUDINARY_CLOUD_NAME` (default `demo`)
    /// - `CLOUDINARY_API_KEY` (default empty)
    /// - `CLOUDINARY_API_SECRET` (default empty)
    /// - `CLOUDINARY_FOLDER` (default `products`)
    ///
    /// Signatures are SHA-256, so the account must have SHA-256 signing
    /// enabled.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self {
            cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_else(|_| "demo".to_string()),
            api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            folder: env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "products".to_string()),
            transformation: DEFAULT_TRANSFORMATION.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            folder: "products".to_string(),
            transformation: DEFAULT_TRANSFORMATION.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Both key and secret are present
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Image upload endpoint
    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_base_url.trim_end_matches('/'),
            self.cloud_name
        )
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set upload folder
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
