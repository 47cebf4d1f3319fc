//! # Authenticated Extractor
//!
//! Protected handlers take an `Authenticated` argument. Extraction runs the
//! auth gate against the `Authorization` header and rejects the request
//! with the gate's error before the handler body runs.

use crate::handlers::{shop_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use shop_core::{User, AUTH_HEADER};

/// The user behind the request's access token
#[derive(Debug, Clone)]
pub struct Authenticated(pub User);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A header that is not valid UTF-8 counts as missing
        let header = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok());

        state
            .auth
            .authenticate(header)
            .await
            .map(Authenticated)
            .map_err(shop_error_to_response)
    }
}
