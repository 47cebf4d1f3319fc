//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the four components, each wired to the store handle built once at
//! startup, plus the configuration.

use shop_cloudinary::CloudinaryImageStore;
use shop_core::{
    AuthGate, BoxedCartStore, BoxedImageStore, BoxedProductStore, BoxedUserStore, CartLedger,
    Catalog, CredentialStore, MemoryStore,
};
use shop_mongo::MongoStore;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_MONGO_URL: &str = "mongodb://localhost/finalproject";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("invalid listen address {0}")]
    InvalidAddress(String),
}

/// Which document store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// MongoDB connection URL
    pub mongo_url: String,
    /// Database name override
    pub mongo_database: Option<String>,
    /// Request body limit (covers image uploads)
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var: "PORT", value })?,
            None => 8080,
        };

        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "STORE_BACKEND",
                    value,
                })?,
            None => StoreBackend::Mongo,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "MAX_UPLOAD_BYTES",
                value,
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            store_backend,
            mongo_url: lookup("MONGO_URL").unwrap_or_else(|| DEFAULT_MONGO_URL.to_string()),
            mongo_database: lookup("MONGO_DATABASE").filter(|db| !db.trim().is_empty()),
            max_upload_bytes,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Registration, login, token lookup
    pub credentials: CredentialStore,
    /// Guard for protected routes
    pub auth: AuthGate,
    /// Cart quantities
    pub cart: CartLedger,
    /// Products and their images
    pub catalog: Catalog,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Connect the configured store and image service
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let images = CloudinaryImageStore::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Cloudinary: {}", e))?;
        if !images.config().is_configured() {
            warn!("Cloudinary credentials not set, image uploads will fail");
        }
        let images: BoxedImageStore = Arc::new(images);

        match config.store_backend {
            StoreBackend::Memory => {
                warn!("Using in-memory store, data is lost on restart");
                Ok(Self::in_memory(config, images))
            }
            StoreBackend::Mongo => {
                let store = Arc::new(
                    MongoStore::connect(&config.mongo_url, config.mongo_database.as_deref())
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to connect to MongoDB: {}", e))?,
                );
                info!("Store backend: mongo");
                Ok(Self::from_stores(
                    config,
                    store.clone(),
                    store.clone(),
                    store,
                    images,
                ))
            }
        }
    }

    /// Wire components to explicit store handles
    pub fn from_stores(
        config: AppConfig,
        users: BoxedUserStore,
        cart: BoxedCartStore,
        products: BoxedProductStore,
        images: BoxedImageStore,
    ) -> Self {
        let credentials = CredentialStore::new(users);
        Self {
            auth: AuthGate::new(credentials.clone()),
            credentials,
            cart: CartLedger::new(cart),
            catalog: Catalog::new(products, images),
            config,
        }
    }

    /// Every collection in one process-local `MemoryStore`
    pub fn in_memory(config: AppConfig, images: BoxedImageStore) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_stores(config, store.clone(), store.clone(), store, images)
    }
}
