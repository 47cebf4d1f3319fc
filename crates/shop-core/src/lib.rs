//! # shop-core
//!
//! Core types, store traits and services for the shopfront backend.
//!
//! This crate provides:
//! - `CredentialStore` for registration, login and token lookup
//! - `AuthGate` for guarding protected operations
//! - `CartLedger` for cart quantities keyed by client item id
//! - `Catalog` for products and their images
//! - `UserStore`, `CartStore`, `ProductStore` and `ImageStore` seams for
//!   the document store and image service
//! - `MemoryStore`, an in-process document store
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartLedger, MemoryStore, NewCartItem};
//! use std::sync::Arc;
//!
//! let ledger = CartLedger::new(Arc::new(MemoryStore::new()));
//!
//! ledger.add_item(NewCartItem::new("sku-1", "Linen shirt", 49.9)).await?;
//! ledger.increment("sku-1").await?;
//!
//! // Quantity 2 -> 1 -> removed
//! ledger.decrement("sku-1").await?;
//! ledger.decrement("sku-1").await?;
//! ```

pub mod auth;
pub mod cart;
pub mod error;
pub mod image;
pub mod memory;
pub mod product;
pub mod store;
pub mod user;
pub mod validation;

// Re-exports for convenience
pub use auth::{extract_token, AuthGate, AUTH_HEADER};
pub use cart::{
    CartDecrement, CartItem, CartLedger, NewCartItem, ERR_CANNOT_ADD_ITEM, ERR_CANNOT_UPDATE_ITEM,
    MAX_CART_QUANTITY,
};
pub use error::{ShopError, ShopResult};
pub use image::{BoxedImageStore, ImageStore, ImageUpload, UploadedImage};
pub use memory::MemoryStore;
pub use product::{
    Catalog, Color, NewProduct, Product, ProductDraft, ProductFilter, ERR_CANNOT_ATTACH_IMAGE,
    ERR_CANNOT_CREATE_PRODUCT,
};
pub use store::{
    BoxedCartStore, BoxedProductStore, BoxedUserStore, CartStore, ProductStore, StoreError,
    StoreResult, UserStore,
};
pub use user::{
    AccessGrant, CredentialStore, Credentials, NewUser, Registration, User, UserSummary,
    ERR_CANNOT_CREATE_USER,
};
pub use validation::{FieldErrors, Validator};
