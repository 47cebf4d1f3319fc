//! End-to-end tests of the HTTP surface over the in-memory store.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::{create_router, AppConfig, AppState, ErrorResponse, ERR_WRONG_CREDENTIALS};
use shop_core::{
    ImageStore, ImageUpload, MemoryStore, NewUser, ShopError, ShopResult, StoreError,
    StoreResult, UploadedImage, User, UserStore,
};
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

/// Pretends every upload lands at a predictable URL
struct FakeImages;

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, image: &ImageUpload) -> ShopResult<UploadedImage> {
        Ok(UploadedImage {
            url: format!("https://images.test/products/{}", image.file_name),
            name: format!("products/{}", image.file_name),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

struct BrokenImages;

#[async_trait]
impl ImageStore for BrokenImages {
    async fn upload(&self, _image: &ImageUpload) -> ShopResult<UploadedImage> {
        Err(ShopError::ImageService("service unavailable".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "broken"
    }
}

/// A user collection whose every call fails
struct UnreachableUsers;

#[async_trait]
impl UserStore for UnreachableUsers {
    async fn insert_user(&self, _user: NewUser) -> StoreResult<User> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find_user_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find_user_by_token(&self, _token: &str) -> StoreResult<Option<User>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

fn test_config() -> AppConfig {
    AppConfig::from_lookup(|_| None).unwrap()
}

fn server_with(images: Arc<dyn ImageStore>) -> TestServer {
    let state = AppState::in_memory(test_config(), images);
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(Arc::new(FakeImages))
}

fn authorization(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(token).unwrap(),
    )
}

async fn register(server: &TestServer, email: &str) -> Value {
    let response = server
        .post("/users")
        .json(&json!({
            "name": "Ada",
            "surname": "Lovelace",
            "email": email,
            "password": "correct horse"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

fn product_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("title", "Linen shirt")
        .add_text("price", "49.90")
        .add_text("color", "beige")
        .add_text("category", "Shirts")
        .add_text("description", "Loose fit summer shirt in washed linen")
        .add_text("availableSizes", "S, M")
        .add_text("availableSizes", "L")
        .add_text("sizes", "S,M,L")
}

fn png_part() -> Part {
    Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
        .file_name("shirt.png")
        .mime_type("image/png")
}

// =============================================================================
// Users & Sessions
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_login_returns_registration_token() {
    let server = server();
    let grant = register(&server, "ada@example.com").await;
    let token = grant["accessToken"].as_str().unwrap();
    assert_eq!(token.len(), 256);

    let response = server
        .post("/sessions")
        .json(&json!({ "email": "ADA@example.com", "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let session = response.json::<Value>();
    assert_eq!(session["accessToken"], token);
    assert_eq!(session["userId"], grant["userId"]);
}

#[tokio::test]
async fn test_login_failure_is_not_found() {
    let server = server();
    register(&server, "ada@example.com").await;

    for body in [
        json!({ "email": "ada@example.com", "password": "wrong password" }),
        json!({ "email": "nobody@example.com", "password": "correct horse" }),
    ] {
        let response = server.post("/sessions").json(&body).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let error = response.json::<ErrorResponse>();
        assert_eq!(error.not_found, Some(true));
        assert_eq!(error.message, ERR_WRONG_CREDENTIALS);
    }
}

#[tokio::test]
async fn test_register_validation_errors() {
    let response = server()
        .post("/users")
        .json(&json!({
            "name": "",
            "surname": "Lovelace",
            "email": "ada@example.com",
            "password": "short"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body = response.json::<ErrorResponse>();
    assert_eq!(body.message, "Could not create user.");
    let errors = body.errors.unwrap();
    assert_eq!(errors["name"], "Name is empty");
    assert_eq!(errors["password"], "Password is too short");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = server();
    register(&server, "ada@example.com").await;

    let response = server
        .post("/users")
        .json(&json!({
            "name": "Ada",
            "surname": "Byron",
            "email": "ada@example.com",
            "password": "another secret"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<ErrorResponse>().errors.unwrap()["email"],
        "Email is already registered"
    );
}

#[tokio::test]
async fn test_list_users_hides_secrets() {
    let server = server();
    register(&server, "ada@example.com").await;

    let users = server.get("/users").await.json::<Value>();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "ada@example.com");
    assert!(users[0].get("accessToken").is_none());
    assert!(users[0].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_protected_route() {
    let server = server();
    let grant = register(&server, "ada@example.com").await;
    let token = grant["accessToken"].as_str().unwrap();
    let user_path = format!("/users/{}", grant["userId"].as_str().unwrap());

    let missing = server.get(&user_path).await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    let body = missing.json::<ErrorResponse>();
    assert_eq!(body.logged_out, Some(true));
    assert_eq!(body.message, "Please try log in again.");

    let (name, value) = authorization("not-a-token");
    server
        .get(&user_path)
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = authorization(token);
    let response = server.get(&user_path).add_header(name, value).await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["secret"], "This is secret");

    let (name, value) = authorization(&format!("Bearer {}", token));
    server
        .get(&user_path)
        .add_header(name, value)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_access_check_failure_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_stores(
        test_config(),
        Arc::new(UnreachableUsers),
        store.clone(),
        store,
        Arc::new(FakeImages),
    );
    let server = TestServer::new(create_router(state)).unwrap();

    let (name, value) = authorization("some-token");
    let response = server.get("/users/abc").add_header(name, value).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let body = response.json::<ErrorResponse>();
    assert_eq!(body.message, "Access token is missing or wrong.");
    assert_eq!(body.logged_out, None);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_scenario() {
    let server = server();

    let added = server
        .post("/cart")
        .json(&json!({
            "id": "sku-1",
            "title": "Linen shirt",
            "price": 49.9,
            "color": "beige",
            "selectedSize": "M",
            "imageUrl": "https://images.test/products/shirt.png",
            "quantity": 1
        }))
        .await;
    added.assert_status(StatusCode::CREATED);
    assert_eq!(added.json::<Value>()["item"]["quantity"], 1);

    server
        .put("/cart/sku-1/increase")
        .await
        .assert_status(StatusCode::CREATED);

    let listed = server.get("/cart").await;
    listed.assert_status(StatusCode::CREATED);
    let listed = listed.json::<Value>();
    assert_eq!(listed["cartItems"][0]["quantity"], 2);
    assert_eq!(listed["cartItems"][0]["selectedSize"], "M");

    let first = server.put("/cart/sku-1/decrease").await.json::<Value>();
    assert_eq!(first["item"]["quantity"], 1);

    let second = server.put("/cart/sku-1/decrease").await;
    second.assert_status(StatusCode::CREATED);
    assert!(second.json::<Value>()["item"].is_null());

    let listed = server.get("/cart").await.json::<Value>();
    assert_eq!(listed["cartItems"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_cart_add_merges_quantities() {
    let server = server();
    let item = json!({ "id": "sku-1", "title": "Linen shirt", "price": 49.9, "quantity": 2 });

    server.post("/cart").json(&item).await;
    let merged = server.post("/cart").json(&item).await.json::<Value>();
    assert_eq!(merged["item"]["quantity"], 4);

    let listed = server.get("/cart").await.json::<Value>();
    assert_eq!(listed["cartItems"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_add_rejects_bad_input() {
    let server = server();

    let response = server
        .post("/cart")
        .json(&json!({ "id": "sku-1", "title": "Linen shirt", "price": 49.9, "quantity": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<ErrorResponse>().message,
        "Could not add item to cart."
    );

    let response = server
        .post("/cart")
        .json(&json!({ "id": "sku-1", "title": "Linen shirt", "price": 49.9, "coupon": "FREE" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<ErrorResponse>().errors.unwrap().contains_key("body"));
}

#[tokio::test]
async fn test_cart_quantity_limit() {
    let server = server();

    let response = server
        .post("/cart")
        .json(&json!({ "id": "sku-1", "title": "Linen shirt", "price": 49.9, "quantity": 10000 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let errors = response.json::<ErrorResponse>().errors.unwrap();
    assert_eq!(errors["quantity"], "Quantity cannot exceed 9999");

    let item = json!({ "id": "sku-1", "title": "Linen shirt", "price": 49.9, "quantity": 9999 });
    server.post("/cart").json(&item).await.assert_status(StatusCode::CREATED);

    let response = server.put("/cart/sku-1/increase").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<ErrorResponse>().message,
        "Could not update cart item."
    );

    let listed = server.get("/cart").await.json::<Value>();
    assert_eq!(listed["cartItems"][0]["quantity"], 9999);
}

#[tokio::test]
async fn test_cart_missing_item() {
    let server = server();

    for path in ["/cart/ghost/increase", "/cart/ghost/decrease"] {
        let response = server.put(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body = response.json::<ErrorResponse>();
        assert_eq!(body.message, "Could not update cart item.");
        assert_eq!(body.not_found, Some(true));
    }

    let response = server.delete("/cart/ghost").await;
    response.assert_status(StatusCode::CREATED);
    assert!(response.json::<Value>()["item"].is_null());
}

#[tokio::test]
async fn test_clear_cart() {
    let server = server();

    let empty = server.delete("/cart").await;
    empty.assert_status(StatusCode::CREATED);
    assert_eq!(empty.json::<Value>()["items"].as_array().unwrap().len(), 0);

    for id in ["sku-1", "sku-2"] {
        server
            .post("/cart")
            .json(&json!({ "id": id, "title": "Item", "price": 10.0 }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let cleared = server.delete("/cart").await.json::<Value>();
    assert_eq!(cleared["items"].as_array().unwrap().len(), 2);

    let listed = server.get("/cart").await.json::<Value>();
    assert_eq!(listed["cartItems"].as_array().unwrap().len(), 0);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_create_product_with_image() {
    let server = server();

    let response = server
        .post("/products")
        .multipart(product_form().add_part("image", png_part()))
        .await;
    response.assert_status(StatusCode::CREATED);

    let product = response.json::<Value>();
    assert_eq!(product["title"], "Linen shirt");
    assert_eq!(product["color"], "beige");
    assert_eq!(product["availableSizes"], json!(["S", "M", "L"]));
    assert_eq!(product["imageName"], "products/shirt.png");

    let path = format!("/products/{}", product["id"].as_str().unwrap());
    let fetched = server.get(&path).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["imageUrl"], product["imageUrl"]);
}

#[tokio::test]
async fn test_create_product_validation() {
    let response = server()
        .post("/products")
        .multipart(
            MultipartForm::new()
                .add_text("title", "Linen shirt")
                .add_text("price", "free")
                .add_text("color", "teal")
                .add_text("discount", "10"),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body = response.json::<ErrorResponse>();
    assert_eq!(body.message, "Could not create product.");
    let errors = body.errors.unwrap();
    for field in ["price", "color", "description", "availableSizes", "image", "discount"] {
        assert!(errors.contains_key(field), "missing error for {field}");
    }
    assert_eq!(errors["discount"], "Unknown field");
}

#[tokio::test]
async fn test_product_routes_require_multipart() {
    let server = server();

    let response = server
        .post("/products")
        .json(&json!({ "title": "Linen shirt", "price": 49.9 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.message, "Could not create product.");
    assert!(body.errors.unwrap().contains_key("body"));

    let response = server.post("/products/ghost/image").text("not a form").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.message, "Could not attach image.");
    assert!(body.errors.unwrap().contains_key("body"));

    let products = server.get("/products").await.json::<Value>();
    assert_eq!(products.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_failed_upload_keeps_product() {
    let server = server_with(Arc::new(BrokenImages));

    let response = server
        .post("/products")
        .multipart(product_form().add_part("image", png_part()))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let products = server.get("/products").await.json::<Value>();
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert!(products[0].get("imageUrl").is_none());

    let id = products[0]["id"].as_str().unwrap();
    assert!(response.json::<ErrorResponse>().message.contains(id));
}

#[tokio::test]
async fn test_image_for_missing_product() {
    let server = server();

    let response = server
        .post("/products/ghost/image")
        .multipart(MultipartForm::new().add_part("image", png_part()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let products = server.get("/products").await.json::<Value>();
    assert_eq!(products.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_products_by_category() {
    let server = server();
    server
        .post("/products")
        .multipart(product_form().add_part("image", png_part()))
        .await
        .assert_status(StatusCode::CREATED);

    let hits = server
        .get("/products")
        .add_query_param("category", "shirt")
        .await
        .json::<Value>();
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let misses = server
        .get("/products")
        .add_query_param("category", "shoes")
        .await
        .json::<Value>();
    assert_eq!(misses.as_array().unwrap().len(), 0);

    server
        .get("/products/ghost")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
