//! # Routes
//!
//! Axum router configuration for the shop API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Users:
///   - POST /users - Register
///   - GET  /users - List users
///   - GET  /users/{id} - Protected resource (needs `Authorization`)
///   - POST /sessions - Log in
///
/// - Catalog:
///   - GET  /products?category= - List products
///   - GET  /products/{id} - Get product
///   - POST /products - Create product (multipart, with image)
///   - POST /products/{id}/image - Upload product image (multipart)
///
/// - Cart:
///   - POST   /cart - Add item
///   - GET    /cart - List items
///   - PUT    /cart/{id}/increase
///   - PUT    /cart/{id}/decrease
///   - DELETE /cart/{id}
///   - DELETE /cart
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let user_routes = Router::new()
        .route("/users", post(handlers::create_user).get(handlers::list_users))
        .route("/users/{id}", get(handlers::get_user_secret))
        .route("/sessions", post(handlers::create_session));

    let catalog_routes = Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/products/{id}", get(handlers::get_product))
        .route("/products/{id}/image", post(handlers::upload_product_image));

    let cart_routes = Router::new()
        .route(
            "/cart",
            post(handlers::add_to_cart)
                .get(handlers::list_cart)
                .delete(handlers::clear_cart),
        )
        .route("/cart/{id}", delete(handlers::delete_cart_item))
        .route("/cart/{id}/increase", put(handlers::increase_cart_item))
        .route("/cart/{id}/decrease", put(handlers::decrease_cart_item));

    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .merge(user_routes)
        .merge(catalog_routes)
        .merge(cart_routes)
        // Middleware
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
