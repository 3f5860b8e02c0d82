//! Authentication: identity providers, request credentials, admin gating
//! and the login/logout/signup handlers.

pub mod cognito;
pub mod http;
pub mod memory;
pub mod session;

use async_trait::async_trait;
use catalog_atoms::store::DocumentStore;
use catalog_atoms::users::is_admin;
use catalog_atoms::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

pub use cognito::CognitoIdentityProvider;
pub use memory::MemoryIdentityProvider;
pub use session::{AuthProvider, SessionAuth};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

pub const WRONG_PASSWORD: &str = "The password is incorrect.";
pub const USER_NOT_FOUND: &str = "No user found with that id.";
pub const INVALID_USER_ID: &str = "Invalid user id format.";
pub const TOO_MANY_ATTEMPTS: &str = "Too many attempts. Please try again later.";
pub const USER_ID_IN_USE: &str = "User id is already in use.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";

const MIN_PASSWORD_LEN: usize = 6;

/// Account as the identity provider knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable subject; keys the user profile.
    pub uid: String,
    pub username: String,
}

/// Signed-in user of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds
    pub expires_in: i32,
}

/// External account service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self, login_name: &str, password: &str) -> CatalogResult<AuthTokens>;

    /// Create an account and return its subject.
    async fn sign_up(&self, login_name: &str, password: &str) -> CatalogResult<String>;

    /// Resolve an access token; unknown or expired tokens are `Unauthorized`.
    async fn resolve(&self, access_token: &str) -> CatalogResult<Identity>;
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub user_id: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> CatalogResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(CatalogError::Validation(INVALID_USER_ID.to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CatalogError::Validation(PASSWORD_TOO_SHORT.to_string()));
        }
        if self.password != self.confirm_password {
            return Err(CatalogError::Validation(PASSWORD_MISMATCH.to_string()));
        }
        Ok(())
    }
}

/// Login name the identity provider stores for a user id.
pub fn login_email(user_id: &str, domain: &str) -> String {
    format!("{}@{}", user_id.trim(), domain)
}

/// User id part of a login name.
pub fn user_id_of(login_name: &str) -> &str {
    login_name.split('@').next().unwrap_or(login_name)
}

pub fn cookie_value<'a>(cookie_header: Option<&'a str>, name: &str) -> Option<&'a str> {
    cookie_header?.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

/// Access token from `Authorization: Bearer` or, failing that, the cookie.
pub fn request_token<'a>(
    authorization: Option<&'a str>,
    cookie_header: Option<&'a str>,
) -> Option<&'a str> {
    authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| cookie_value(cookie_header, ACCESS_TOKEN_COOKIE))
}

pub fn session_cookie(name: &str, value: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        name, value, max_age
    )
}

pub fn clear_cookie(name: &str) -> String {
    session_cookie(name, "", 0)
}

/// Resolve the request's credentials. No token means an anonymous visitor;
/// a token the provider rejects is an error.
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    docs: &dyn DocumentStore,
    token: Option<&str>,
) -> CatalogResult<Option<AuthUser>> {
    let Some(token) = token else {
        return Ok(None);
    };
    let id = identity.resolve(token).await?;
    let is_admin = is_admin(docs, &id.uid).await?;
    Ok(Some(AuthUser {
        uid: id.uid,
        username: id.username,
        is_admin,
    }))
}

pub fn require_user(user: Option<&AuthUser>) -> CatalogResult<&AuthUser> {
    user.ok_or(CatalogError::Unauthorized)
}

pub fn require_admin(user: Option<&AuthUser>) -> CatalogResult<&AuthUser> {
    let user = require_user(user)?;
    if user.is_admin {
        Ok(user)
    } else {
        Err(CatalogError::Forbidden("Admin access required".to_string()))
    }
}

/// `Access-Control-Allow-Origin` value for a request. `allowed` is `*` or a
/// comma-separated list of origins.
pub fn cors_origin(allowed: &str, request_origin: Option<&str>) -> String {
    if allowed.trim() == "*" {
        // credentials are allowed, so echo the caller instead of "*"
        return request_origin.unwrap_or("*").to_string();
    }
    let mut origins = allowed.split(',').map(str::trim).filter(|o| !o.is_empty());
    let first = origins.clone().next().unwrap_or("*");
    match request_origin {
        Some(origin) if origins.any(|o| o == origin) => origin.to_string(),
        _ => first.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_atoms::store::MemoryDocumentStore;
    use catalog_atoms::users::USERS_COLLECTION;
    use serde_json::json;

    fn signup(password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            user_id: "kim".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn signup_validation_messages() {
        assert_eq!(
            signup("12345", "12345").validate(),
            Err(CatalogError::Validation(PASSWORD_TOO_SHORT.into()))
        );
        assert_eq!(
            signup("123456", "1234567").validate(),
            Err(CatalogError::Validation(PASSWORD_MISMATCH.into()))
        );
        assert_eq!(signup("123456", "123456").validate(), Ok(()));
    }

    #[test]
    fn token_prefers_bearer_header() {
        let cookies = Some("theme=dark; access_token=from-cookie");
        assert_eq!(request_token(Some("Bearer abc"), cookies), Some("abc"));
        assert_eq!(request_token(None, cookies), Some("from-cookie"));
        assert_eq!(request_token(Some("Basic xyz"), None), None);
        assert_eq!(request_token(None, Some("access_token=")), None);
    }

    #[test]
    fn login_names_round_trip() {
        let email = login_email(" kim ", "example.com");
        assert_eq!(email, "kim@example.com");
        assert_eq!(user_id_of(&email), "kim");
    }

    #[test]
    fn cors_echoes_allowed_origins() {
        assert_eq!(cors_origin("*", Some("https://a.test")), "https://a.test");
        assert_eq!(cors_origin("*", None), "*");
        let allowed = "https://a.test, https://b.test";
        assert_eq!(cors_origin(allowed, Some("https://b.test")), "https://b.test");
        assert_eq!(cors_origin(allowed, Some("https://evil.test")), "https://a.test");
    }

    #[tokio::test]
    async fn admin_gate_reads_profile() {
        let idp = MemoryIdentityProvider::new();
        let docs = MemoryDocumentStore::new();
        let uid = idp.sign_up("boss@example.com", "secret1").await.unwrap();
        docs.put(
            USERS_COLLECTION,
            &uid,
            json!({ "user_name": "boss", "is_admin": true }).as_object().cloned().unwrap(),
        )
        .await
        .unwrap();
        let tokens = idp.login("boss@example.com", "secret1").await.unwrap();

        let user = authenticate(&idp, &docs, Some(&tokens.access_token)).await.unwrap();
        assert!(require_admin(user.as_ref()).is_ok());

        assert_eq!(authenticate(&idp, &docs, None).await.unwrap(), None);
        assert_eq!(require_admin(None), Err(CatalogError::Unauthorized));
        assert_eq!(
            authenticate(&idp, &docs, Some("bogus")).await,
            Err(CatalogError::Unauthorized)
        );
    }
}
