//! # Product Catalog
//!
//! Product records and the Catalog Accessor.
//!
//! Products are created in two phases: the record is inserted first, then the
//! uploaded image's URL and name are attached with a separate partial update.

use crate::error::{ShopError, ShopResult};
use crate::image::{BoxedImageStore, ImageUpload, UploadedImage};
use crate::store::BoxedProductStore;
use crate::validation::{normalize_set, FieldErrors, Validator};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{error, info, instrument};

pub const ERR_CANNOT_CREATE_PRODUCT: &str = "Could not create product.";
pub const ERR_CANNOT_ATTACH_IMAGE: &str = "Could not attach image.";

/// Minimum description length (in characters)
pub const MIN_DESCRIPTION_LEN: usize = 20;

/// Colors a product can be listed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
    Grey,
    Red,
    Blue,
    Green,
    Yellow,
    Pink,
    Purple,
    Orange,
    Brown,
    Beige,
}

impl Color {
    pub const ALL: [Color; 12] = [
        Color::Black,
        Color::White,
        Color::Grey,
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Pink,
        Color::Purple,
        Color::Orange,
        Color::Brown,
        Color::Beige,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Grey => "grey",
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Pink => "pink",
            Color::Purple => "purple",
            Color::Orange => "orange",
            Color::Brown => "brown",
            Color::Beige => "beige",
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Color::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Color::ALL.iter().map(Color::as_str).collect();
                format!("Color must be one of: {}", names.join(", "))
            })
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
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

/// A validated product about to be inserted (no id, no image yet)
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub title: String,
    pub price: f64,
    pub color: Color,
    pub category: String,
    pub description: String,
    pub available_sizes: Vec<String>,
    pub sizes: Vec<String>,
}

impl NewProduct {
    pub fn into_product(self, id: impl Into<String>) -> Product {
        Product {
            id: id.into(),
            title: self.title,
            price: self.price,
            color: self.color,
            category: self.category,
            description: self.description,
            available_sizes: self.available_sizes,
            sizes: self.sizes,
            image_url: None,
            image_name: None,
        }
    }
}

/// Raw catalog submission, as received from a form
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub title: String,
    pub price: String,
    pub color: String,
    pub category: String,
    pub description: String,
    pub available_sizes: Vec<String>,
    pub sizes: Vec<String>,
    pub image: Option<ImageUpload>,
}

impl ProductDraft {
    /// Check every field, reporting all problems at once.
    ///
    /// `transport_errors` carries problems found while reading the request
    /// (unknown fields and the like) so they are reported alongside.
    pub fn validate(&self, transport_errors: FieldErrors) -> ShopResult<NewProduct> {
        let price = self.price.trim().parse::<f64>().ok();
        let color = Color::from_str(&self.color);
        let available_sizes = normalize_set(self.available_sizes.clone());

        let mut v = Validator::new();
        v.merge(transport_errors)
            .require("title", &self.title, "Title is empty")
            .check(
                "price",
                price.is_some_and(|p| p.is_finite() && p > 0.0),
                "Price must be a positive number",
            )
            .check(
                "color",
                color.is_ok(),
                color.as_ref().err().map(String::as_str).unwrap_or_default(),
            )
            .check(
                "description",
                self.description.trim().chars().count() >= MIN_DESCRIPTION_LEN,
                "Description must be at least 20 characters",
            )
            .check(
                "availableSizes",
                !available_sizes.is_empty(),
                "At least one available size is required",
            )
            .check("image", self.image.is_some(), "Image is required")
            .check(
                "image",
                self.image.as_ref().map_or(true, ImageUpload::is_image),
                "Image must be a non-empty image file",
            );
        v.finish(ERR_CANNOT_CREATE_PRODUCT)?;

        match (price, color) {
            (Some(price), Ok(color)) => Ok(NewProduct {
                title: self.title.trim().to_string(),
                price,
                color,
                category: self.category.trim().to_string(),
                description: self.description.trim().to_string(),
                available_sizes,
                sizes: normalize_set(self.sizes.clone()),
            }),
            _ => Err(ShopError::Internal(
                "validated draft lost its price or color".to_string(),
            )),
        }
    }
}

/// Listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the category
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
        }
    }

    /// The category needle, ignoring blank input
    pub fn category_needle(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self.category_needle() {
            Some(needle) => product
                .category
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Catalog Accessor
#[derive(Clone)]
pub struct Catalog {
    products: BoxedProductStore,
    images: BoxedImageStore,
}

impl Catalog {
    pub fn new(products: BoxedProductStore, images: BoxedImageStore) -> Self {
        Self { products, images }
    }

    /// Validate and insert a product, then upload its image and attach it.
    ///
    /// If the upload fails the product stays in the catalog without an image
    /// and an `ImageService` error naming the product id is returned.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(
        &self,
        draft: ProductDraft,
        transport_errors: FieldErrors,
    ) -> ShopResult<Product> {
        let new_product = draft.validate(transport_errors)?;
        let product = self.products.insert_product(new_product).await?;
        info!(product_id = %product.id, "Created product");

        let Some(image) = draft.image else {
            return Ok(product);
        };

        let uploaded = self.images.upload(&image).await.map_err(|e| {
            error!(product_id = %product.id, error = %e, "Image upload failed");
            ShopError::ImageService(format!(
                "product {} was created but its image upload failed: {}",
                product.id, e
            ))
        })?;

        self.attach_image(&product.id, uploaded).await
    }

    /// Upload an image for an existing product and attach it
    #[instrument(skip(self, image), fields(file = %image.file_name))]
    pub async fn upload_image(&self, product_id: &str, image: ImageUpload) -> ShopResult<Product> {
        if !image.is_image() {
            return Err(ShopError::invalid_field(
                ERR_CANNOT_ATTACH_IMAGE,
                "image",
                "Image must be a non-empty image file",
            ));
        }
        // Avoid orphaned uploads for unknown products
        self.get_by_id(product_id).await?;

        let uploaded = self.images.upload(&image).await?;
        self.attach_image(product_id, uploaded).await
    }

    /// Set image URL and name on an existing product in one atomic update
    #[instrument(skip(self, image))]
    pub async fn attach_image(
        &self,
        product_id: &str,
        image: UploadedImage,
    ) -> ShopResult<Product> {
        let product = self
            .products
            .set_product_image(product_id, &image)
            .await?
            .ok_or_else(|| ShopError::not_found("product", product_id))?;
        info!(image = %image.name, "Attached product image");
        Ok(product)
    }

    pub async fn list(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        Ok(self.products.list_products(filter).await?)
    }

    pub async fn get_by_id(&self, product_id: &str) -> ShopResult<Product> {
        self.products
            .find_product(product_id)
            .await?
            .ok_or_else(|| ShopError::not_found("product", product_id))
    }
}
