//! # shop-mongo
//!
//! MongoDB document store for shopfront-rs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_core::{CartLedger, NewCartItem};
//! use shop_mongo::MongoStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MongoStore::connect("mongodb://localhost/finalproject", None).await?);
//! let ledger = CartLedger::new(store);
//!
//! ledger.add_item(NewCartItem::new("sku-1", "Linen shirt", 49.9)).await?;
//! ```

mod documents;
pub mod store;

pub use store::{MongoStore, DEFAULT_DATABASE};
