//! # Request Handlers
//!
//! Axum request handlers for the shop API.
//! Handlers decode the request, call one component and turn its result into
//! a JSON response; every `ShopError` is converted here.

use crate::auth::Authenticated;
use crate::state::AppState;
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{
    AccessGrant, CartDecrement, CartItem, Credentials, FieldErrors, ImageUpload, NewCartItem,
    Product, ProductDraft, ProductFilter, Registration, ShopError, UserSummary,
    ERR_CANNOT_ADD_ITEM, ERR_CANNOT_ATTACH_IMAGE, ERR_CANNOT_CREATE_PRODUCT,
    ERR_CANNOT_CREATE_USER, ERR_CANNOT_UPDATE_ITEM,
};
use tracing::{error, info, instrument, warn};

/// Login failures never say which half of the credentials was wrong
pub const ERR_WRONG_CREDENTIALS: &str = "Wrong email or password.";

/// Rejection type shared by every handler
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found: Option<bool>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
            logged_out: None,
            not_found: None,
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// `{message, item}`; `item` is null when a decrement removed the entry
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub message: String,
    pub item: Option<CartItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartListResponse {
    pub message: String,
    pub cart_items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct CartClearedResponse {
    pub message: String,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct SecretResponse {
    pub secret: String,
}

/// Convert a component error into a status code and body
pub fn shop_error_to_response(err: ShopError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let response = match err {
        ShopError::Validation { message, errors } => {
            ErrorResponse::new(message).with_errors(errors)
        }
        ShopError::NotFound { .. } => ErrorResponse {
            not_found: Some(true),
            ..ErrorResponse::new(err.to_string())
        },
        ShopError::Unauthenticated => ErrorResponse {
            logged_out: Some(true),
            ..ErrorResponse::new(err.to_string())
        },
        ShopError::AccessCheckFailed | ShopError::ImageService(_) => {
            ErrorResponse::new(err.to_string())
        }
        ShopError::Store(_) | ShopError::Configuration(_) | ShopError::Internal(_) => {
            // Details stay in the log
            error!(error = %err, "Request failed");
            ErrorResponse::new("Internal server error")
        }
    };

    (status, Json(response))
}

/// Unwrap a JSON body, reporting a malformed one as a validation failure
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected request body");
        shop_error_to_response(ShopError::invalid_field(
            message,
            "body",
            rejection.body_text(),
        ))
    })
}

/// Unwrap a multipart body, reporting a missing or malformed one like a bad JSON body
fn multipart_body(
    payload: Result<Multipart, MultipartRejection>,
    message: &str,
) -> ApiResult<Multipart> {
    payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected multipart body");
        shop_error_to_response(ShopError::invalid_field(
            message,
            "body",
            rejection.body_text(),
        ))
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopfront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Register a user
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AccessGrant>)> {
    let registration = json_body(payload, ERR_CANNOT_CREATE_USER)?;
    let grant = state
        .credentials
        .register(registration)
        .await
        .map_err(shop_error_to_response)?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// List users (public fields only)
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = state
        .credentials
        .list_users()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(users))
}

/// Protected resource
#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_user_secret(
    Authenticated(user): Authenticated,
    Path(id): Path<String>,
) -> (StatusCode, Json<SecretResponse>) {
    info!(requested = %id, "Serving secret");
    (
        StatusCode::CREATED,
        Json(SecretResponse {
            secret: "This is secret".to_string(),
        }),
    )
}

/// Log in
#[instrument(skip(state, payload))]
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AccessGrant>)> {
    let credentials = json_body(payload, "Could not log in.")?;
    let grant = state
        .credentials
        .login(credentials)
        .await
        .map_err(|e| not_found_message(e, ERR_WRONG_CREDENTIALS))?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// List products, optionally filtered by category
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .catalog
        .list(&filter)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products))
}

/// Get a single product
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .catalog
        .get_by_id(&id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(product))
}

/// Create a product from a multipart form, then upload and attach its image
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let multipart = multipart_body(payload, ERR_CANNOT_CREATE_PRODUCT)?;
    let (draft, transport_errors) = read_product_form(multipart)
        .await
        .map_err(shop_error_to_response)?;

    let product = state
        .catalog
        .create(draft, transport_errors)
        .await
        .map_err(shop_error_to_response)?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Upload (or replace) the image of an existing product
#[instrument(skip(state, payload))]
pub async fn upload_product_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let multipart = multipart_body(payload, ERR_CANNOT_ATTACH_IMAGE)?;
    let (draft, _) = read_product_form(multipart).await.map_err(|e| match e {
        ShopError::Validation { errors, .. } => shop_error_to_response(ShopError::Validation {
            message: ERR_CANNOT_ATTACH_IMAGE.to_string(),
            errors,
        }),
        other => shop_error_to_response(other),
    })?;

    let image = draft.image.ok_or_else(|| {
        shop_error_to_response(ShopError::invalid_field(
            ERR_CANNOT_ATTACH_IMAGE,
            "image",
            "Image is required",
        ))
    })?;

    let product = state
        .catalog
        .upload_image(&id, image)
        .await
        .map_err(shop_error_to_response)?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Add an item to the cart
#[instrument(skip(state, payload))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    payload: Result<Json<NewCartItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CartItemResponse>)> {
    let item = json_body(payload, ERR_CANNOT_ADD_ITEM)?;
    let item = state
        .cart
        .add_item(item)
        .await
        .map_err(shop_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            message: "Item added to cart.".to_string(),
            item: Some(item),
        }),
    ))
}

/// List cart contents
pub async fn list_cart(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<CartListResponse>)> {
    let cart_items = state
        .cart
        .list_items()
        .await
        .map_err(shop_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CartListResponse {
            message: "Cart items.".to_string(),
            cart_items,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn increase_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<CartItemResponse>)> {
    let item = state
        .cart
        .increment(&id)
        .await
        .map_err(cart_update_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            message: "Item quantity increased.".to_string(),
            item: Some(item),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn decrease_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<CartItemResponse>)> {
    let outcome = state
        .cart
        .decrement(&id)
        .await
        .map_err(cart_update_error)?;

    let response = match outcome {
        CartDecrement::Decremented(item) => CartItemResponse {
            message: "Item quantity decreased.".to_string(),
            item: Some(item),
        },
        CartDecrement::Removed(_) => CartItemResponse {
            message: "Item removed from cart.".to_string(),
            item: None,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Remove one entry; an absent id still succeeds
#[instrument(skip(state))]
pub async fn delete_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<CartItemResponse>)> {
    let item = state
        .cart
        .delete_one(&id)
        .await
        .map_err(shop_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            message: "Item removed from cart.".to_string(),
            item,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<CartClearedResponse>)> {
    let items = state
        .cart
        .delete_all()
        .await
        .map_err(shop_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CartClearedResponse {
            message: format!("Removed {} items from cart.", items.len()),
            items,
        }),
    ))
}

/// Keep the `{message, notFound}` shape but replace the message of a miss
fn not_found_message(err: ShopError, message: &str) -> ApiError {
    let (status, Json(mut response)) = shop_error_to_response(err);
    if status == StatusCode::NOT_FOUND {
        response.message = message.to_string();
    }
    (status, Json(response))
}

fn cart_update_error(err: ShopError) -> ApiError {
    not_found_message(err, ERR_CANNOT_UPDATE_ITEM)
}

// =============================================================================
// Multipart
// =============================================================================

/// Read a product form into a draft.
///
/// Problems with individual parts (unknown names, unreadable text) are
/// collected per field and returned next to the draft so validation can
/// report them together. A broken multipart stream fails outright.
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<(ProductDraft, FieldErrors), ShopError> {
    let mut draft = ProductDraft::default();
    let mut errors = FieldErrors::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Unreadable multipart body");
        ShopError::invalid_field(ERR_CANNOT_CREATE_PRODUCT, "body", e.body_text())
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                warn!(error = %e, "Unreadable image part");
                ShopError::invalid_field(ERR_CANNOT_CREATE_PRODUCT, "image", e.body_text())
            })?;
            draft.image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec()));
            continue;
        }

        let Some(value) = read_text(field, &name, &mut errors).await else {
            continue;
        };

        match name.as_str() {
            "title" => draft.title = value,
            "price" => draft.price = value,
            "color" => draft.color = value,
            "category" => draft.category = value,
            "description" => draft.description = value,
            "availableSizes" => draft.available_sizes.extend(split_list(&value)),
            "sizes" => draft.sizes.extend(split_list(&value)),
            _ => {
                errors.entry(name).or_insert_with(|| "Unknown field".to_string());
            }
        }
    }

    Ok((draft, errors))
}

async fn read_text(field: Field<'_>, name: &str, errors: &mut FieldErrors) -> Option<String> {
    match field.text().await {
        Ok(value) => Some(value),
        Err(e) => {
            errors
                .entry(name.to_string())
                .or_insert_with(|| format!("Unreadable field: {}", e.body_text()));
            None
        }
    }
}

/// `"S, M,L"` -> `["S", "M", "L"]`
fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
