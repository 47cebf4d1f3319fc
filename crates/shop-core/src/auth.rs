//! # Auth Gate
//!
//! Guard for protected operations. A route asks the gate for the principal
//! behind a request's token and either gets the `User` back or a typed
//! failure:
//!
//! - no token, or no user with that token: `ShopError::Unauthenticated`
//! - the lookup itself failed: `ShopError::AccessCheckFailed`

use crate::error::{ShopError, ShopResult};
use crate::user::{CredentialStore, User};
use tracing::{debug, error, warn};

/// Name of the request header carrying the access token
pub const AUTH_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct AuthGate {
    credentials: CredentialStore,
}

impl AuthGate {
    pub fn new(credentials: CredentialStore) -> Self {
        Self { credentials }
    }

    /// Resolve the principal for a raw `Authorization` header value
    pub async fn authenticate(&self, header: Option<&str>) -> ShopResult<User> {
        let token = match header.map(extract_token) {
            Some(token) if !token.is_empty() => token,
            _ => {
                debug!("Request without access token");
                return Err(ShopError::Unauthenticated);
            }
        };

        match self.credentials.find_by_token(token).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                warn!("Access token matched no user");
                Err(ShopError::Unauthenticated)
            }
            Err(e) => {
                error!(error = %e, "Access check failed");
                Err(ShopError::AccessCheckFailed)
            }
        }
    }
}

/// The raw token, accepting an optional `Bearer ` prefix
pub fn extract_token(header: &str) -> &str {
    let header = header.trim();
    match header.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => header,
    }
}
