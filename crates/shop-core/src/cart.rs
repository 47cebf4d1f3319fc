//! # Cart Ledger
//!
//! Quantity-per-item cart state, keyed by the client-supplied item id.
//!
//! Each id is either absent or present with `quantity >= 1`:
//!
//! ```text
//!            add(q)              increment
//!  ABSENT ───────────▶ PRESENT(q) ◀─────────┐
//!    ▲                   │   │  ────────────┘
//!    │  decrement at 1   │   │  decrement at q > 1
//!    └───────────────────┘   └──▶ PRESENT(q - 1)
//! ```
//!
//! Adding an id that is already present merges: the quantities are summed
//! and the entry keeps its original descriptive fields.

use crate::error::{ShopError, ShopResult};
use crate::store::{BoxedCartStore, StoreError};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const ERR_CANNOT_ADD_ITEM: &str = "Could not add item to cart.";
pub const ERR_CANNOT_UPDATE_ITEM: &str = "Could not update cart item.";

/// Largest quantity one cart entry may hold
pub const MAX_CART_QUANTITY: u32 = 9_999;

/// A cart entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Client-supplied item id (not the store's document id)
    #[serde(rename = "id")]
    pub external_id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub selected_size: String,
    #[serde(default)]
    pub image_url: String,
    pub quantity: u32,
}

/// Add-to-cart input
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCartItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub selected_size: String,
    #[serde(default)]
    pub image_url: String,
    /// Defaults to 1
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl NewCartItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.selected_size = size.into();
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Validate and turn into a storable entry
    pub fn into_item(self) -> ShopResult<CartItem> {
        let quantity = self.quantity.unwrap_or(1);
        let mut v = Validator::new();
        v.require("id", &self.id, "Item id is empty")
            .require("title", &self.title, "Title is empty")
            .check("price", self.price.is_some(), "Price is missing")
            .check(
                "price",
                self.price.map_or(true, |p| p.is_finite() && p >= 0.0),
                "Price must be a non-negative number",
            )
            .check("quantity", quantity >= 1, "Quantity must be at least 1")
            .check("quantity", quantity <= MAX_CART_QUANTITY, QUANTITY_TOO_LARGE);
        v.finish(ERR_CANNOT_ADD_ITEM)?;

        Ok(CartItem {
            external_id: self.id.trim().to_string(),
            title: self.title.trim().to_string(),
            price: self.price.unwrap_or_default(),
            color: self.color,
            selected_size: self.selected_size,
            image_url: self.image_url,
            quantity,
        })
    }
}

const QUANTITY_TOO_LARGE: &str = "Quantity cannot exceed 9999";

/// A store refusal to go past the quantity cap, as a validation failure
fn quantity_limit(message: &str, err: StoreError) -> ShopError {
    match err {
        StoreError::QuantityLimit(_) => {
            ShopError::invalid_field(message, "quantity", QUANTITY_TOO_LARGE)
        }
        other => ShopError::from(other),
    }
}

/// Outcome of a decrement
#[derive(Debug, Clone, PartialEq)]
pub enum CartDecrement {
    /// Quantity went down and the entry remains
    Decremented(CartItem),
    /// Quantity was 1; the entry is gone (holds its last state)
    Removed(CartItem),
}

impl CartDecrement {
    /// The entry as it now stands, `None` when removed
    pub fn remaining(&self) -> Option<&CartItem> {
        match self {
            CartDecrement::Decremented(item) => Some(item),
            CartDecrement::Removed(_) => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, CartDecrement::Removed(_))
    }
}

/// Cart Ledger
#[derive(Clone)]
pub struct CartLedger {
    store: BoxedCartStore,
}

impl CartLedger {
    pub fn new(store: BoxedCartStore) -> Self {
        Self { store }
    }

    /// Add an item, merging quantities with an existing entry of the same id
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_item(&self, item: NewCartItem) -> ShopResult<CartItem> {
        let item = item.into_item()?;
        let stored = self
            .store
            .upsert_cart_item(item)
            .await
            .map_err(|e| quantity_limit(ERR_CANNOT_ADD_ITEM, e))?;
        info!(quantity = stored.quantity, "Added item to cart");
        Ok(stored)
    }

    pub async fn list_items(&self) -> ShopResult<Vec<CartItem>> {
        Ok(self.store.list_cart_items().await?)
    }

    #[instrument(skip(self))]
    pub async fn increment(&self, external_id: &str) -> ShopResult<CartItem> {
        let item = self
            .store
            .increment_cart_item(external_id)
            .await
            .map_err(|e| quantity_limit(ERR_CANNOT_UPDATE_ITEM, e))?
            .ok_or_else(|| ShopError::not_found("cart item", external_id))?;
        info!(quantity = item.quantity, "Increased cart item");
        Ok(item)
    }

    /// Decrease by one; at quantity 1 the entry is removed
    #[instrument(skip(self))]
    pub async fn decrement(&self, external_id: &str) -> ShopResult<CartDecrement> {
        let outcome = self
            .store
            .decrement_cart_item(external_id)
            .await?
            .ok_or_else(|| ShopError::not_found("cart item", external_id))?;
        match &outcome {
            CartDecrement::Decremented(item) => {
                info!(quantity = item.quantity, "Decreased cart item")
            }
            CartDecrement::Removed(_) => info!("Removed cart item at zero quantity"),
        }
        Ok(outcome)
    }

    /// Remove one entry; removing an absent id is not an error
    #[instrument(skip(self))]
    pub async fn delete_one(&self, external_id: &str) -> ShopResult<Option<CartItem>> {
        let removed = self.store.remove_cart_item(external_id).await?;
        info!(existed = removed.is_some(), "Deleted cart item");
        Ok(removed)
    }

    /// Empty the cart, returning the removed entries
    #[instrument(skip(self))]
    pub async fn delete_all(&self) -> ShopResult<Vec<CartItem>> {
        let removed = self.store.clear_cart().await?;
        info!(count = removed.len(), "Cleared cart");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    fn ledger() -> CartLedger {
        CartLedger::new(Arc::new(MemoryStore::new()))
    }

    async fn quantity_of(ledger: &CartLedger, id: &str) -> Option<u32> {
        ledger
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.external_id == id)
            .map(|i| i.quantity)
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let item = NewCartItem::new("sku-1", "Tee", 19.5).into_item().unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_into_item_validation() {
        let err = NewCartItem::default().with_quantity(0).into_item().unwrap_err();
        match err {
            ShopError::Validation { message, errors } => {
                assert_eq!(message, ERR_CANNOT_ADD_ITEM);
                assert!(errors.contains_key("id"));
                assert!(errors.contains_key("title"));
                assert_eq!(errors["price"], "Price is missing");
                assert_eq!(errors["quantity"], "Quantity must be at least 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(NewCartItem::new("sku-1", "Tee", -1.0).into_item().is_err());
        assert!(NewCartItem::new("sku-1", "Tee", f64::NAN).into_item().is_err());
    }

    #[test]
    fn test_quantity_cap() {
        let at_cap = NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(MAX_CART_QUANTITY);
        assert_eq!(at_cap.into_item().unwrap().quantity, MAX_CART_QUANTITY);

        let over = NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(MAX_CART_QUANTITY + 1);
        match over.into_item().unwrap_err() {
            ShopError::Validation { errors, .. } => {
                assert_eq!(errors["quantity"], "Quantity cannot exceed 9999");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_merge_and_increment_stop_at_cap() {
        let ledger = ledger();
        let near_cap = NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(MAX_CART_QUANTITY - 1);
        ledger.add_item(near_cap).await.unwrap();

        let err = ledger
            .add_item(NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation { ref message, .. } if message == ERR_CANNOT_ADD_ITEM
        ));
        assert_eq!(quantity_of(&ledger, "sku-1").await, Some(MAX_CART_QUANTITY - 1));

        let item = ledger.increment("sku-1").await.unwrap();
        assert_eq!(item.quantity, MAX_CART_QUANTITY);

        let err = ledger.increment("sku-1").await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation { ref message, .. } if message == ERR_CANNOT_UPDATE_ITEM
        ));
        assert_eq!(quantity_of(&ledger, "sku-1").await, Some(MAX_CART_QUANTITY));
    }

    #[test]
    fn test_wire_format() {
        let item = NewCartItem::new("sku-1", "Tee", 19.5)
            .with_color("red")
            .with_size("M")
            .with_image("https://img/1.png")
            .into_item()
            .unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "sku-1");
        assert_eq!(json["selectedSize"], "M");
        assert_eq!(json["imageUrl"], "https://img/1.png");
        assert_eq!(json["quantity"], 1);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed: Result<NewCartItem, _> =
            serde_json::from_str(r#"{"id":"sku-1","title":"Tee","price":1,"discount":5}"#);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_add_increment_decrement_scenario() {
        let ledger = ledger();
        ledger
            .add_item(NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(1))
            .await
            .unwrap();

        let item = ledger.increment("sku-1").await.unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(quantity_of(&ledger, "sku-1").await, Some(2));

        let first = ledger.decrement("sku-1").await.unwrap();
        assert_eq!(first.remaining().map(|i| i.quantity), Some(1));

        let second = ledger.decrement("sku-1").await.unwrap();
        assert!(second.is_removed());
        assert_eq!(quantity_of(&ledger, "sku-1").await, None);
    }

    #[tokio::test]
    async fn test_decrement_at_three_keeps_item() {
        let ledger = ledger();
        ledger
            .add_item(NewCartItem::new("sku-3", "Cap", 9.0).with_quantity(3))
            .await
            .unwrap();

        let outcome = ledger.decrement("sku-3").await.unwrap();
        assert!(!outcome.is_removed());
        assert_eq!(quantity_of(&ledger, "sku-3").await, Some(2));
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let ledger = ledger();
        assert!(matches!(
            ledger.increment("ghost").await,
            Err(ShopError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.decrement("ghost").await,
            Err(ShopError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_same_id_merges() {
        let ledger = ledger();
        ledger
            .add_item(NewCartItem::new("sku-1", "Tee", 19.5).with_quantity(2))
            .await
            .unwrap();
        let merged = ledger
            .add_item(NewCartItem::new("sku-1", "Tee (renamed)", 21.0).with_quantity(3))
            .await
            .unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.title, "Tee");
        assert_eq!(ledger.list_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_one_is_idempotent() {
        let ledger = ledger();
        ledger
            .add_item(NewCartItem::new("sku-1", "Tee", 19.5))
            .await
            .unwrap();

        let removed = ledger.delete_one("sku-1").await.unwrap();
        assert_eq!(removed.map(|i| i.external_id), Some("sku-1".to_string()));
        assert!(ledger.delete_one("sku-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let ledger = ledger();
        assert!(ledger.delete_all().await.unwrap().is_empty());

        ledger.add_item(NewCartItem::new("a", "A", 1.0)).await.unwrap();
        ledger.add_item(NewCartItem::new("b", "B", 2.0)).await.unwrap();

        assert_eq!(ledger.delete_all().await.unwrap().len(), 2);
        assert!(ledger.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_decrements_remove_once() {
        let ledger = ledger();
        ledger
            .add_item(NewCartItem::new("sku-1", "Tee", 19.5))
            .await
            .unwrap();

        let (a, b) = tokio::join!(ledger.decrement("sku-1"), ledger.decrement("sku-1"));
        let removed = [a, b]
            .into_iter()
            .filter(|r| matches!(r, Ok(CartDecrement::Removed(_))))
            .count();
        assert_eq!(removed, 1);
        assert_eq!(quantity_of(&ledger, "sku-1").await, None);
    }
}
