//! # In-Memory Store
//!
//! A process-local document store implementing every store trait. Used by
//! tests and by `STORE_BACKEND=memory` for local runs; nothing survives a
//! restart.
//!
//! Each collection sits behind its own `RwLock`, and every cart transition
//! runs under a single write guard, so concurrent mutations of one item are
//! serialized.

use crate::cart::{CartDecrement, CartItem, MAX_CART_QUANTITY};
use crate::image::UploadedImage;
use crate::product::{NewProduct, Product, ProductFilter};
use crate::store::{CartStore, ProductStore, StoreError, StoreResult, UserStore};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    cart: RwLock<Vec<CartItem>>,
    products: RwLock<Vec<Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `current + by`, refused past `MAX_CART_QUANTITY`
fn capped_add(external_id: &str, current: u32, by: u32) -> StoreResult<u32> {
    current
        .checked_add(by)
        .filter(|q| *q <= MAX_CART_QUANTITY)
        .ok_or_else(|| StoreError::QuantityLimit(external_id.to_string()))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate { field: "email" });
        }
        let user = user.into_user(new_id());
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.access_token == token).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn upsert_cart_item(&self, item: CartItem) -> StoreResult<CartItem> {
        let mut cart = self.cart.write().await;
        match cart.iter_mut().find(|i| i.external_id == item.external_id) {
            Some(existing) => {
                existing.quantity =
                    capped_add(&item.external_id, existing.quantity, item.quantity)?;
                Ok(existing.clone())
            }
            None => {
                capped_add(&item.external_id, 0, item.quantity)?;
                cart.push(item.clone());
                Ok(item)
            }
        }
    }

    async fn list_cart_items(&self) -> StoreResult<Vec<CartItem>> {
        Ok(self.cart.read().await.clone())
    }

    async fn increment_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>> {
        let mut cart = self.cart.write().await;
        let Some(item) = cart.iter_mut().find(|i| i.external_id == external_id) else {
            return Ok(None);
        };
        item.quantity = capped_add(external_id, item.quantity, 1)?;
        Ok(Some(item.clone()))
    }

    async fn decrement_cart_item(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<CartDecrement>> {
        let mut cart = self.cart.write().await;
        let Some(pos) = cart.iter().position(|i| i.external_id == external_id) else {
            return Ok(None);
        };

        if cart[pos].quantity > 1 {
            cart[pos].quantity -= 1;
            Ok(Some(CartDecrement::Decremented(cart[pos].clone())))
        } else {
            Ok(Some(CartDecrement::Removed(cart.remove(pos))))
        }
    }

    async fn remove_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>> {
        let mut cart = self.cart.write().await;
        Ok(cart
            .iter()
            .position(|i| i.external_id == external_id)
            .map(|pos| cart.remove(pos)))
    }

    async fn clear_cart(&self) -> StoreResult<Vec<CartItem>> {
        let mut cart = self.cart.write().await;
        Ok(std::mem::take(&mut *cart))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
        let product = product.into_product(new_id());
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn set_product_image(
        &self,
        id: &str,
        image: &UploadedImage,
    ) -> StoreResult<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|p| p.id == id).map(|product| {
            product.image_url = Some(image.url.clone());
            product.image_name = Some(image.name.clone());
            product.clone()
        }))
    }
}
