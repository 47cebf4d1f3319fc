//! # Shopfront RS
//!
//! E-commerce backend: accounts, catalog and cart over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export MONGO_URL=mongodb://localhost/finalproject
//! export CLOUDINARY_CLOUD_NAME=...
//! export CLOUDINARY_API_KEY=...
//! export CLOUDINARY_API_SECRET=...
//!
//! # Run the server
//! shopfront
//! ```

use shop_api::{routes, state::AppConfig, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    info!("Environment: {}", config.environment);
    info!("Store backend: {:?}", config.store_backend);

    let state = AppState::new(config).await?;
    let app = routes::create_router(state);

    info!("🛍️  Shopfront starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("👤 Register: POST http://{}/users", addr);
        info!("🛒 Cart: http://{}/cart", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  🛍️  Shopfront RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Accounts, catalog and cart
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
