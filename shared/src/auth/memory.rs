use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use catalog_atoms::{CatalogError, CatalogResult};

use super::{user_id_of, AuthTokens, Identity, IdentityProvider, USER_ID_IN_USE, USER_NOT_FOUND, WRONG_PASSWORD};

const TOKEN_LIFETIME_SECS: i32 = 3600;

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
    // latest access token; logging in again revokes the previous one
    token: Option<String>,
}

#[derive(Debug, Default)]
struct Accounts {
    by_login: HashMap<String, Account>,
    // access token -> login name
    tokens: HashMap<String, String>,
}

/// Accounts and opaque tokens kept in process.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<Accounts>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_accounts<T>(&self, f: impl FnOnce(&mut Accounts) -> CatalogResult<T>) -> CatalogResult<T> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|_| CatalogError::Auth("identity store poisoned".to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn login(&self, login_name: &str, password: &str) -> CatalogResult<AuthTokens> {
        self.with_accounts(|accounts| {
            let account = accounts
                .by_login
                .get_mut(login_name)
                .ok_or_else(|| CatalogError::Auth(USER_NOT_FOUND.to_string()))?;
            if account.password != password {
                return Err(CatalogError::Auth(WRONG_PASSWORD.to_string()));
            }
            let token = uuid::Uuid::new_v4().simple().to_string();
            if let Some(previous) = account.token.replace(token.clone()) {
                accounts.tokens.remove(&previous);
            }
            accounts.tokens.insert(token.clone(), login_name.to_string());
            Ok(AuthTokens {
                access_token: token,
                refresh_token: None,
                expires_in: TOKEN_LIFETIME_SECS,
            })
        })
    }

    async fn sign_up(&self, login_name: &str, password: &str) -> CatalogResult<String> {
        self.with_accounts(|accounts| {
            if accounts.by_login.contains_key(login_name) {
                return Err(CatalogError::Validation(USER_ID_IN_USE.to_string()));
            }
            let uid = uuid::Uuid::new_v4().to_string();
            accounts.by_login.insert(
                login_name.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    token: None,
                },
            );
            Ok(uid)
        })
    }

    async fn resolve(&self, access_token: &str) -> CatalogResult<Identity> {
        self.with_accounts(|accounts| {
            let login = accounts
                .tokens
                .get(access_token)
                .ok_or(CatalogError::Unauthorized)?;
            let account = accounts.by_login.get(login).ok_or(CatalogError::Unauthorized)?;
            Ok(Identity {
                uid: account.uid.clone(),
                username: user_id_of(login).to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_errors_name_the_cause() {
        let idp = MemoryIdentityProvider::new();
        idp.sign_up("kim@example.com", "secret1").await.unwrap();

        assert_eq!(
            idp.login("lee@example.com", "secret1").await,
            Err(CatalogError::Auth(USER_NOT_FOUND.into()))
        );
        assert_eq!(
            idp.login("kim@example.com", "nope").await,
            Err(CatalogError::Auth(WRONG_PASSWORD.into()))
        );
        assert_eq!(
            idp.sign_up("kim@example.com", "other1").await,
            Err(CatalogError::Validation(USER_ID_IN_USE.into()))
        );
    }

    #[tokio::test]
    async fn issued_tokens_resolve_to_the_account() {
        let idp = MemoryIdentityProvider::new();
        let uid = idp.sign_up("kim@example.com", "secret1").await.unwrap();
        let tokens = idp.login("kim@example.com", "secret1").await.unwrap();

        let identity = idp.resolve(&tokens.access_token).await.unwrap();
        assert_eq!(identity, Identity { uid, username: "kim".into() });
    }

    #[tokio::test]
    async fn new_login_replaces_the_previous_token() {
        let idp = MemoryIdentityProvider::new();
        idp.sign_up("kim@example.com", "secret1").await.unwrap();
        let first = idp.login("kim@example.com", "secret1").await.unwrap();
        let second = idp.login("kim@example.com", "secret1").await.unwrap();

        assert_eq!(idp.resolve(&first.access_token).await, Err(CatalogError::Unauthorized));
        assert!(idp.resolve(&second.access_token).await.is_ok());
        assert_eq!(idp.with_accounts(|a| Ok(a.tokens.len())).unwrap(), 1);
    }
}
