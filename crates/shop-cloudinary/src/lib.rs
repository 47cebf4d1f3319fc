//! # shop-cloudinary
//!
//! Cloudinary image storage for shopfront-rs.
//!
//! Uploads are signed with the account secret and stored under a folder
//! with a size-limiting transformation. The store returns the upload's
//! `secure_url` and `public_id`, which the catalog attaches to a product.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_cloudinary::CloudinaryImageStore;
//! use shop_core::{ImageStore, ImageUpload};
//!
//! let images = CloudinaryImageStore::from_env()?;
//!
//! let uploaded = images
//!     .upload(&ImageUpload::new("shirt.png", "image/png", bytes))
//!     .await?;
//!
//! println!("{} -> {}", uploaded.name, uploaded.url);
//! ```

pub mod config;
pub mod upload;

// Re-exports
pub use config::CloudinaryConfig;
pub use upload::CloudinaryImageStore;
