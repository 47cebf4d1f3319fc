//! # MongoDB Store
//!
//! `MongoStore` implements the shop-core store traits over three collections
//! (`users`, `carts`, `products`). Every cart transition is one conditional
//! server-side update, so concurrent requests on the same item cannot
//! interleave a read with a stale write.

use crate::documents::{
    cart_key, cart_mergeable, cart_step, cart_upsert, decrementable, image_update,
    parse_object_id, product_filter, removable, ProductDocument, UserDocument,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use shop_core::{
    CartDecrement, CartItem, CartStore, NewProduct, NewUser, Product, ProductFilter,
    ProductStore, StoreError, StoreResult, UploadedImage, User, UserStore, MAX_CART_QUANTITY,
};
use tracing::{debug, info, instrument};

/// Database used when neither the URL nor the caller names one
pub const DEFAULT_DATABASE: &str = "finalproject";

const USERS: &str = "users";
const CARTS: &str = "carts";
const PRODUCTS: &str = "products";

const DUPLICATE_KEY: i32 = 11000;

/// Rounds of a conditional cart update before giving up on contention
const MAX_CART_ATTEMPTS: usize = 3;

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<UserDocument>,
    cart: Collection<CartItem>,
    products: Collection<ProductDocument>,
}

impl MongoStore {
    /// Connect, pick the database and make sure indexes exist.
    ///
    /// The database is `database` if given, else the one named in the URL,
    /// else [`DEFAULT_DATABASE`].
    pub async fn connect(url: &str, database: Option<&str>) -> StoreResult<Self> {
        let options = ClientOptions::parse(url).await.map_err(unavailable)?;
        let name = database
            .map(str::to_string)
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options).map_err(unavailable)?;
        let store = Self::from_database(&client.database(&name));
        store.ensure_indexes().await?;

        info!(database = %name, "Connected to MongoDB");
        Ok(store)
    }

    pub fn from_database(db: &Database) -> Self {
        Self {
            users: db.collection(USERS),
            cart: db.collection(CARTS),
            products: db.collection(PRODUCTS),
        }
    }

    /// Unique emails, fast token lookup, one cart entry per external id
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        self.users
            .create_index(unique_index("email"))
            .await
            .map_err(unavailable)?;
        self.users
            .create_index(IndexModel::builder().keys(doc! { "accessToken": 1 }).build())
            .await
            .map_err(unavailable)?;
        self.cart
            .create_index(unique_index("id"))
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

impl MongoStore {
    /// `QuantityLimit` if the stored entry cannot take `by` more
    async fn check_room(&self, external_id: &str, by: u32) -> StoreResult<()> {
        let current = self
            .cart
            .find_one(cart_key(external_id))
            .await
            .map_err(unavailable)?
            .map_or(0, |item| item.quantity);
        if u64::from(current) + u64::from(by) > u64::from(MAX_CART_QUANTITY) {
            return Err(StoreError::QuantityLimit(external_id.to_string()));
        }
        Ok(())
    }
}

fn unique_index(field: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn unavailable(err: MongoError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl UserStore for MongoStore {
    #[instrument(skip(self, user))]
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let result = self
            .users
            .insert_one(UserDocument::from_new(&user))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::Duplicate { field: "email" }
                } else {
                    unavailable(e)
                }
            })?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Malformed("inserted user id is not an ObjectId".into()))?;
        Ok(user.into_user(id.to_hex()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await
            .map_err(unavailable)?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "accessToken": token })
            .await
            .map_err(unavailable)?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let docs: Vec<UserDocument> = self
            .users
            .find(doc! {})
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;
        docs.into_iter().map(UserDocument::into_user).collect()
    }
}

#[async_trait]
impl CartStore for MongoStore {
    /// Upsert filtered on the cap. A duplicate-key failure means the entry
    /// exists but did not match: either it is too full to merge, or it was
    /// inserted concurrently and the upsert is worth another round.
    #[instrument(skip(self, item), fields(item_id = %item.external_id))]
    async fn upsert_cart_item(&self, item: CartItem) -> StoreResult<CartItem> {
        let id = item.external_id.as_str();
        if item.quantity > MAX_CART_QUANTITY {
            return Err(StoreError::QuantityLimit(id.to_string()));
        }
        for attempt in 1..=MAX_CART_ATTEMPTS {
            match self
                .cart
                .find_one_and_update(cart_mergeable(id, item.quantity), cart_upsert(&item))
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
            {
                Ok(Some(stored)) => return Ok(stored),
                Ok(None) => {
                    return Err(StoreError::Malformed("upsert returned no document".into()))
                }
                Err(e) if is_duplicate_key(&e) => self.check_room(id, item.quantity).await?,
                Err(e) => return Err(unavailable(e)),
            }
            debug!(attempt, "Cart upsert raced a concurrent insert");
        }
        Err(StoreError::Contention(id.to_string()))
    }

    async fn list_cart_items(&self) -> StoreResult<Vec<CartItem>> {
        self.cart
            .find(doc! {})
            .await
            .map_err(unavailable)?
            .try_collect::<Vec<CartItem>>()
            .await
            .map_err(unavailable)
    }

    #[instrument(skip(self))]
    async fn increment_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>> {
        for attempt in 1..=MAX_CART_ATTEMPTS {
            if let Some(item) = self
                .cart
                .find_one_and_update(cart_mergeable(external_id, 1), cart_step(1))
                .return_document(ReturnDocument::After)
                .await
                .map_err(unavailable)?
            {
                return Ok(Some(item));
            }

            let exists = self
                .cart
                .find_one(cart_key(external_id))
                .await
                .map_err(unavailable)?
                .is_some();
            if !exists {
                return Ok(None);
            }
            self.check_room(external_id, 1).await?;
            debug!(attempt, "Cart item moved during increment");
        }
        Err(StoreError::Contention(external_id.to_string()))
    }

    /// Decrement where `quantity > 1`, else delete where `quantity <= 1`.
    ///
    /// Each step is atomic on its own. If neither matched but the entry
    /// exists, a concurrent write moved it across the boundary between the
    /// two steps, so the pair runs again.
    #[instrument(skip(self))]
    async fn decrement_cart_item(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<CartDecrement>> {
        for attempt in 1..=MAX_CART_ATTEMPTS {
            if let Some(item) = self
                .cart
                .find_one_and_update(decrementable(external_id), cart_step(-1))
                .return_document(ReturnDocument::After)
                .await
                .map_err(unavailable)?
            {
                return Ok(Some(CartDecrement::Decremented(item)));
            }

            if let Some(item) = self
                .cart
                .find_one_and_delete(removable(external_id))
                .await
                .map_err(unavailable)?
            {
                return Ok(Some(CartDecrement::Removed(item)));
            }

            if self
                .cart
                .find_one(cart_key(external_id))
                .await
                .map_err(unavailable)?
                .is_none()
            {
                return Ok(None);
            }
            debug!(attempt, "Cart item moved between conditional updates");
        }
        Err(StoreError::Contention(external_id.to_string()))
    }

    #[instrument(skip(self))]
    async fn remove_cart_item(&self, external_id: &str) -> StoreResult<Option<CartItem>> {
        self.cart
            .find_one_and_delete(cart_key(external_id))
            .await
            .map_err(unavailable)
    }

    /// Deletes one entry at a time until none is left, so each returned
    /// record is the entry as it was when removed and entries added while
    /// clearing are removed too
    #[instrument(skip(self))]
    async fn clear_cart(&self) -> StoreResult<Vec<CartItem>> {
        let mut removed = Vec::new();
        while let Some(item) = self
            .cart
            .find_one_and_delete(doc! {})
            .await
            .map_err(unavailable)?
        {
            removed.push(item);
        }
        debug!(deleted = removed.len(), "Cleared cart");
        Ok(removed)
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    #[instrument(skip(self, product), fields(title = %product.title))]
    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
        let result = self
            .products
            .insert_one(ProductDocument::from_new(&product))
            .await
            .map_err(unavailable)?;

        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Malformed("inserted product id is not an ObjectId".into())
        })?;
        Ok(product.into_product(id.to_hex()))
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let Some(oid) = parse_object_id(id) else {
            return Ok(None);
        };
        self.products
            .find_one(doc! { "_id": oid })
            .await
            .map_err(unavailable)?
            .map(ProductDocument::into_product)
            .transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let docs: Vec<ProductDocument> = self
            .products
            .find(product_filter(filter))
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;
        docs.into_iter().map(ProductDocument::into_product).collect()
    }

    #[instrument(skip(self, image))]
    async fn set_product_image(
        &self,
        id: &str,
        image: &UploadedImage,
    ) -> StoreResult<Option<Product>> {
        let Some(oid) = parse_object_id(id) else {
            return Ok(None);
        };
        self.products
            .find_one_and_update(doc! { "_id": oid }, image_update(image))
            .return_document(ReturnDocument::After)
            .await
            .map_err(unavailable)?
            .map(ProductDocument::into_product)
            .transpose()
    }
}
