//! # Users and Credentials
//!
//! Registration, login and token lookup.
//!
//! A user receives one opaque access token at registration. The token never
//! rotates: logging in again hands back the same value. Passwords are kept
//! only as Argon2 PHC strings.

use crate::error::{ShopError, ShopResult};
use crate::store::{BoxedUserStore, StoreError};
use crate::validation::Validator;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{error, info, instrument, warn};

pub const ERR_CANNOT_CREATE_USER: &str = "Could not create user.";

/// Minimum accepted password length (in characters)
pub const MIN_PASSWORD_LEN: usize = 8;

/// Random bytes behind each access token (hex-encoded to twice this length)
pub const ACCESS_TOKEN_BYTES: usize = 128;

/// A stored user
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A user about to be inserted (the store assigns the id)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: String,
}

impl NewUser {
    pub fn into_user(self, id: impl Into<String>) -> User {
        User {
            id: id.into(),
            name: self.name,
            surname: self.surname,
            email: self.email,
            password_hash: self.password_hash,
            access_token: self.access_token,
        }
    }
}

/// Registration input
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> ShopResult<()> {
        let mut v = Validator::new();
        v.require("name", &self.name, "Name is empty")
            .require("surname", &self.surname, "Surname is empty")
            .require("email", &self.email, "Email is empty")
            .check("email", self.email.contains('@'), "Email is invalid")
            .check(
                "password",
                self.password.chars().count() >= MIN_PASSWORD_LEN,
                "Password is too short",
            );
        v.finish(ERR_CANNOT_CREATE_USER)
    }
}

/// Login input
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Returned by register and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub user_id: String,
    pub access_token: String,
}

impl From<&User> for AccessGrant {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            access_token: user.access_token.clone(),
        }
    }
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
        }
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// A throwaway hash to verify against when no user matches
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("shopfront-placeholder").ok())
        .as_deref()
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a fresh access token
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Credential Store: user records, password checks, token issue and lookup
#[derive(Clone)]
pub struct CredentialStore {
    users: BoxedUserStore,
}

impl CredentialStore {
    pub fn new(users: BoxedUserStore) -> Self {
        Self { users }
    }

    /// Create a user and issue their access token
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> ShopResult<AccessGrant> {
        let registration = Registration {
            name: registration.name.trim().to_string(),
            surname: registration.surname.trim().to_string(),
            email: normalize_email(&registration.email),
            password: registration.password,
        };
        registration.validate()?;

        if self
            .users
            .find_user_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(email_taken());
        }

        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ShopError::Internal(format!("password hashing task failed: {}", e)))?
            .map_err(|e| ShopError::Internal(format!("password hashing failed: {}", e)))?;

        let user = self
            .users
            .insert_user(NewUser {
                name: registration.name,
                surname: registration.surname,
                email: registration.email,
                password_hash,
                access_token: generate_access_token(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { field: "email" } => email_taken(),
                other => ShopError::from(other),
            })?;

        info!(user_id = %user.id, "Registered user");
        Ok(AccessGrant::from(&user))
    }

    /// Check credentials and return the user's existing token.
    ///
    /// Every failure, including an unreachable store, is reported as
    /// `NotFound`.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> ShopResult<AccessGrant> {
        let email = normalize_email(&credentials.email);
        let not_found = || ShopError::not_found("user", email.clone());

        let user = match self.users.find_user_by_email(&email).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "User lookup failed during login");
                return Err(not_found());
            }
        };

        // Unknown emails still pay for one verification
        let password = credentials.password;
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => verify_password(&password, &hash),
            None => {
                if let Some(dummy) = dummy_hash() {
                    verify_password(&password, dummy);
                }
                false
            }
        })
        .await
        .unwrap_or(false);

        let user = match user {
            Some(user) if verified => user,
            Some(user) => {
                warn!(user_id = %user.id, "Login with wrong password");
                return Err(not_found());
            }
            None => {
                warn!("Login for unknown email");
                return Err(not_found());
            }
        };

        info!(user_id = %user.id, "User logged in");
        Ok(AccessGrant::from(&user))
    }

    /// Exact-match token lookup. An empty token never matches.
    pub async fn find_by_token(&self, token: &str) -> ShopResult<Option<User>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.users.find_user_by_token(token).await?)
    }

    pub async fn list_users(&self) -> ShopResult<Vec<UserSummary>> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }
}

fn email_taken() -> ShopError {
    ShopError::invalid_field(ERR_CANNOT_CREATE_USER, "email", "Email is already registered")
}
