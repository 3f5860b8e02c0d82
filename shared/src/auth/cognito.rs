use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::AuthFlowType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use catalog_atoms::{CatalogError, CatalogResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{
    user_id_of, AuthTokens, Identity, IdentityProvider, INVALID_USER_ID, TOO_MANY_ATTEMPTS,
    USER_ID_IN_USE, USER_NOT_FOUND, WRONG_PASSWORD,
};
use crate::config::CognitoSettings;

type HmacSha256 = Hmac<Sha256>;

/// `SECRET_HASH` for app clients that carry a secret:
/// base64(HMAC-SHA256(secret, username + client_id)).
pub fn secret_hash(username: &str, client_id: &str, client_secret: &str) -> CatalogResult<String> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| CatalogError::Config(format!("invalid Cognito client secret: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub struct CognitoIdentityProvider {
    client: CognitoClient,
    settings: CognitoSettings,
}

impl CognitoIdentityProvider {
    pub fn new(client: CognitoClient, settings: CognitoSettings) -> Self {
        Self { client, settings }
    }

    fn secret_hash(&self, username: &str) -> CatalogResult<String> {
        secret_hash(username, &self.settings.client_id, &self.settings.client_secret)
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn login(&self, login_name: &str, password: &str) -> CatalogResult<AuthTokens> {
        let result = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.settings.client_id)
            .auth_parameters("USERNAME", login_name)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", self.secret_hash(login_name)?)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let message = match err.as_service_error() {
                    Some(e) if e.is_user_not_found_exception() => USER_NOT_FOUND.to_string(),
                    Some(e) if e.is_too_many_requests_exception() => TOO_MANY_ATTEMPTS.to_string(),
                    Some(e) if e.is_invalid_parameter_exception() => INVALID_USER_ID.to_string(),
                    Some(e) if e.is_not_authorized_exception() => {
                        // Cognito reports lockout as NotAuthorized
                        if e.to_string().contains("attempts exceeded") {
                            TOO_MANY_ATTEMPTS.to_string()
                        } else {
                            WRONG_PASSWORD.to_string()
                        }
                    }
                    _ => {
                        tracing::error!("Cognito initiate_auth failed: {:?}", err);
                        format!("Login failed: {}", err)
                    }
                };
                return Err(CatalogError::Auth(message));
            }
        };

        let auth = output
            .authentication_result()
            .ok_or_else(|| CatalogError::Auth("Login failed: additional challenge required".to_string()))?;
        let access_token = auth
            .access_token()
            .ok_or_else(|| CatalogError::Auth("Login failed: no access token issued".to_string()))?;

        Ok(AuthTokens {
            access_token: access_token.to_string(),
            refresh_token: auth.refresh_token().map(str::to_string),
            expires_in: auth.expires_in(),
        })
    }

    async fn sign_up(&self, login_name: &str, password: &str) -> CatalogResult<String> {
        let output = self
            .client
            .sign_up()
            .client_id(&self.settings.client_id)
            .secret_hash(self.secret_hash(login_name)?)
            .username(login_name)
            .password(password)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_username_exists_exception() => {
                    CatalogError::Validation(USER_ID_IN_USE.to_string())
                }
                Some(e) if e.is_invalid_password_exception() => {
                    CatalogError::Validation(format!("Signup failed: {}", e))
                }
                _ => {
                    tracing::error!("Cognito sign_up failed: {:?}", err);
                    CatalogError::Auth(format!("Signup failed: {}", err))
                }
            })?;

        if let Some(pool_id) = &self.settings.user_pool_id {
            self.client
                .admin_confirm_sign_up()
                .user_pool_id(pool_id)
                .username(login_name)
                .send()
                .await
                .map_err(|e| CatalogError::Auth(format!("Signup failed: {}", e)))?;
        }

        Ok(output.user_sub().to_string())
    }

    async fn resolve(&self, access_token: &str) -> CatalogResult<Identity> {
        let output = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().map(|e| e.is_not_authorized_exception()) == Some(true) {
                    CatalogError::Unauthorized
                } else {
                    tracing::error!("Cognito get_user failed: {:?}", err);
                    CatalogError::Auth(format!("Token check failed: {}", err))
                }
            })?;

        let uid = output
            .user_attributes()
            .iter()
            .find(|attr| attr.name() == "sub")
            .and_then(|attr| attr.value())
            .ok_or(CatalogError::Unauthorized)?;

        Ok(Identity {
            uid: uid.to_string(),
            username: user_id_of(output.username()).to_string(),
        })
    }
}
