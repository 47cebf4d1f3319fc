//! # Stored Documents
//!
//! BSON shapes for the `users` and `products` collections, plus the filter
//! and update documents the store sends. Cart entries are stored as
//! `CartItem` directly; the server-assigned `_id` is ignored on read.

use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use shop_core::{
    CartItem, Color, NewProduct, NewUser, Product, ProductFilter, StoreError, StoreResult,
    UploadedImage, User, MAX_CART_QUANTITY,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: String,
}

impl UserDocument {
    pub fn from_new(user: &NewUser) -> Self {
        Self {
            id: None,
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            access_token: user.access_token.clone(),
        }
    }

    pub fn into_user(self) -> StoreResult<User> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Malformed("user document without _id".to_string()))?;
        Ok(User {
            id: id.to_hex(),
            name: self.name,
            surname: self.surname,
            email: self.email,
            password_hash: self.password_hash,
            access_token: self.access_token,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub price: f64,
    pub color: Color,
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
}

impl ProductDocument {
    pub fn from_new(product: &NewProduct) -> Self {
        Self {
            id: None,
            title: product.title.clone(),
            price: product.price,
            color: product.color,
            category: product.category.clone(),
            description: product.description.clone(),
            available_sizes: product.available_sizes.clone(),
            sizes: product.sizes.clone(),
            image_url: None,
            image_name: None,
        }
    }

    pub fn into_product(self) -> StoreResult<Product> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Malformed("product document without _id".to_string()))?;
        Ok(Product {
            id: id.to_hex(),
            title: self.title,
            price: self.price,
            color: self.color,
            category: self.category,
            description: self.description,
            available_sizes: self.available_sizes,
            sizes: self.sizes,
            image_url: self.image_url,
            image_name: self.image_name,
        })
    }
}

/// Unparseable ids cannot name a stored document
pub(crate) fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id.trim()).ok()
}

pub(crate) fn cart_key(external_id: &str) -> Document {
    doc! { "id": external_id }
}

/// Entries that can take `by` more without passing the cap.
///
/// Used as an upsert filter: an absent id inserts, an entry at the cap
/// matches nothing and the insert collides with the unique `id` index.
pub(crate) fn cart_mergeable(external_id: &str, by: u32) -> Document {
    let ceiling = i64::from(MAX_CART_QUANTITY) - i64::from(by);
    doc! { "id": external_id, "quantity": { "$lte": ceiling } }
}

/// Add the quantity; descriptive fields are only written on insert
pub(crate) fn cart_upsert(item: &CartItem) -> Document {
    doc! {
        "$inc": { "quantity": i64::from(item.quantity) },
        "$setOnInsert": {
            "title": item.title.as_str(),
            "price": item.price,
            "color": item.color.as_str(),
            "selectedSize": item.selected_size.as_str(),
            "imageUrl": item.image_url.as_str(),
        },
    }
}

pub(crate) fn cart_step(delta: i64) -> Document {
    doc! { "$inc": { "quantity": delta } }
}

/// Entries that survive a decrement
pub(crate) fn decrementable(external_id: &str) -> Document {
    doc! { "id": external_id, "quantity": { "$gt": 1 } }
}

/// Entries a decrement removes
pub(crate) fn removable(external_id: &str) -> Document {
    doc! { "id": external_id, "quantity": { "$lte": 1 } }
}

/// Case-insensitive literal substring match on category
pub(crate) fn product_filter(filter: &ProductFilter) -> Document {
    match filter.category_needle() {
        Some(needle) => doc! {
            "category": { "$regex": regex::escape(needle), "$options": "i" }
        },
        None => doc! {},
    }
}

pub(crate) fn image_update(image: &UploadedImage) -> Document {
    doc! {
        "$set": {
            "imageUrl": image.url.as_str(),
            "imageName": image.name.as_str(),
        }
    }
}
