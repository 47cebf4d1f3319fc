//! # Store Traits
//!
//! The document store seen from the service layer. Each collection gets its
//! own trait so components only hold the handle they need.
//!
//! ```text
//! ┌───────────────┐  ┌───────────────┐  ┌───────────────┐
//! │   UserStore   │  │   CartStore   │  │ ProductStore  │
//! └───────▲───────┘  └───────▲───────┘  └───────▲───────┘
//!         └──────────────────┼──────────────────┘
//!                  ┌─────────┴─────────┐
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │  MemoryStore  │   │  MongoStore   │
//!          │  (shop-core)  │   │ (shop-mongo)  │
//!          └───────────────┘   └───────────────┘
//! ```
//!
//! Cart mutations are expressed as whole state transitions
//! (`increment_cart_item`, `decrement_cart_item`) so an implementation can run
//! each one as a single conditional update instead of read-then-write.

use crate::cart::{CartDecrement, CartItem};
use crate::image::UploadedImage;
use crate::product::{NewProduct, Product, ProductFilter};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("duplicate value for unique field `{field}`")]
    Duplicate { field: &'static str },

    /// Backend unreachable or the operation failed
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A conditional update kept losing to concurrent writers
    #[error("concurrent updates on `{0}` did not settle")]
    Contention(String),

    /// The write would take a cart quantity past `MAX_CART_QUANTITY`
    #[error("quantity limit reached for `{0}`")]
    QuantityLimit(String),

    /// A stored document could not be decoded
    #[error("malformed document: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User collection
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `Duplicate { field: "email" }` on a taken email
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Exact match on the access token
    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

/// Cart collection, keyed by the client-supplied external id
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Insert `item`, or add its quantity to the existing entry with the
    /// same external id. Returns the stored entry.
    async fn upsert_cart_item(&self, item: CartItem) -> StoreResult<CartItem>;

    async fn list_cart_items(&self) -> StoreResult<Vec<CartItem>>;

    /// `quantity += 1`; `None` when absent
    async fn increment_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>>;

    /// `quantity -= 1`, removing the entry instead of reaching zero;
    /// `None` when absent
    async fn decrement_cart_item(&self, external_id: &str)
        -> StoreResult<Option<CartDecrement>>;

    /// Remove one entry, returning it if it existed
    async fn remove_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>>;

    /// Remove every entry, returning what was removed
    async fn clear_cart(&self) -> StoreResult<Vec<CartItem>>;
}

/// Product collection
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product>;

    /// `None` for unknown or unparseable ids
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    /// Set image fields on an existing product in one update; never inserts.
    /// `None` when the product does not exist.
    async fn set_product_image(
        &self,
        id: &str,
        image: &UploadedImage,
    ) -> StoreResult<Option<Product>>;
}

pub type BoxedUserStore = Arc<dyn UserStore>;
pub type BoxedCartStore = Arc<dyn CartStore>;
pub type BoxedProductStore = Arc<dyn ProductStore>;
