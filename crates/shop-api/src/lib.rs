//! # shop-api
//!
//! HTTP API layer for shopfront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for users, sessions, products and the cart
//! - The `Authenticated` extractor guarding protected routes
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/users` | Register |
//! | GET | `/users` | List users |
//! | GET | `/users/:id` | Protected resource |
//! | POST | `/sessions` | Log in |
//! | GET | `/products` | List products (`?category=`) |
//! | GET | `/products/:id` | Get product |
//! | POST | `/products` | Create product (multipart) |
//! | POST | `/products/:id/image` | Upload product image |
//! | POST | `/cart` | Add item |
//! | GET | `/cart` | List items |
//! | PUT | `/cart/:id/increase` | Increase quantity |
//! | PUT | `/cart/:id/decrease` | Decrease quantity |
//! | DELETE | `/cart/:id` | Remove item |
//! | DELETE | `/cart` | Empty cart |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::Authenticated;
pub use handlers::{ErrorResponse, ERR_WRONG_CREDENTIALS};
pub use routes::create_router;
pub use state::{AppConfig, AppState, StoreBackend};
