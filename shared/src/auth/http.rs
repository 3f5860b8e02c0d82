use catalog_atoms::http::{error_response, json_response};
use catalog_atoms::store::DocumentStore;
use catalog_atoms::users::{create_user_profile, get_user};
use catalog_atoms::{CatalogError, CatalogResult};
use lambda_http::http::header::SET_COOKIE;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::de::DeserializeOwned;

use super::{
    clear_cookie, login_email, session_cookie, AuthUser, IdentityProvider, LoginRequest,
    SignupRequest, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};

// refresh tokens outlive the access token; Cognito's default is 30 days
const REFRESH_COOKIE_MAX_AGE: i64 = 30 * 24 * 3600;

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> CatalogResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| CatalogError::Validation(format!("Invalid request body: {}", e)))
}

/// HTTP Handler: POST /login
pub async fn login(
    identity: &dyn IdentityProvider,
    email_domain: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: LoginRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(&e),
    };
    tracing::info!("🔑 login: user_id={}", req.user_id);

    let tokens = match identity
        .login(&login_email(&req.user_id, email_domain), &req.password)
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!("Login rejected for {}: {}", req.user_id, e);
            return error_response(&e);
        }
    };

    let mut resp = json_response(StatusCode::OK, &tokens)?;
    let headers = resp.headers_mut();
    headers.append(
        SET_COOKIE,
        session_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, tokens.expires_in.into()).parse()?,
    );
    if let Some(refresh) = &tokens.refresh_token {
        headers.append(
            SET_COOKIE,
            session_cookie(REFRESH_TOKEN_COOKIE, refresh, REFRESH_COOKIE_MAX_AGE).parse()?,
        );
    }
    Ok(resp)
}

/// HTTP Handler: POST /logout
pub fn logout() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header(SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE))
        .header(SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE))
        .body(serde_json::json!({"message": "ok"}).to_string().into())
        .map_err(Box::new)?)
}

/// Create the account and its (non-admin) profile.
pub async fn sign_up_user(
    identity: &dyn IdentityProvider,
    docs: &dyn DocumentStore,
    email_domain: &str,
    req: &SignupRequest,
) -> CatalogResult<catalog_atoms::users::User> {
    req.validate()?;
    let user_id = req.user_id.trim();
    let uid = identity
        .sign_up(&login_email(user_id, email_domain), &req.password)
        .await?;
    create_user_profile(docs, &uid, user_id).await
}

/// HTTP Handler: POST /signup (admins only; the caller checks)
pub async fn signup(
    identity: &dyn IdentityProvider,
    docs: &dyn DocumentStore,
    email_domain: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: SignupRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(&e),
    };
    tracing::info!("📝 signup: user_id={}", req.user_id);
    match sign_up_user(identity, docs, email_domain, &req).await {
        Ok(user) => json_response(StatusCode::CREATED, &user),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: GET /users/me
pub async fn current_user(docs: &dyn DocumentStore, user: &AuthUser) -> Result<Response<Body>, Error> {
    match get_user(docs, &user.uid).await {
        Ok(Some(profile)) => json_response(StatusCode::OK, &profile),
        Ok(None) => error_response(&CatalogError::NotFound("User not found".to_string())),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryIdentityProvider, PASSWORD_MISMATCH, USER_ID_IN_USE};
    use catalog_atoms::store::MemoryDocumentStore;
    use serde_json::{json, Value};

    fn body(resp: &Response<Body>) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    fn signup_body(user_id: &str, password: &str, confirm: &str) -> Vec<u8> {
        json!({ "user_id": user_id, "password": password, "confirm_password": confirm })
            .to_string()
            .into_bytes()
    }

    #[tokio::test]
    async fn signup_then_login_sets_cookie() {
        let idp = MemoryIdentityProvider::new();
        let docs = MemoryDocumentStore::new();

        let resp = signup(&idp, &docs, "example.com", &signup_body("kim", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body(&resp)["user_name"], "kim");
        assert_eq!(body(&resp)["is_admin"], false);

        let login_body = json!({ "user_id": "kim", "password": "secret1" }).to_string();
        let resp = login(&idp, "example.com", login_body.as_bytes()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_token="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn signup_rejections() {
        let idp = MemoryIdentityProvider::new();
        let docs = MemoryDocumentStore::new();

        let resp = signup(&idp, &docs, "example.com", &signup_body("kim", "secret1", "secret2"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&resp)["error"], PASSWORD_MISMATCH);

        signup(&idp, &docs, "example.com", &signup_body("kim", "secret1", "secret1"))
            .await
            .unwrap();
        let resp = signup(&idp, &docs, "example.com", &signup_body("kim", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(body(&resp)["error"], USER_ID_IN_USE);
    }

    #[test]
    fn logout_clears_both_cookies() {
        let resp = logout().unwrap();
        let cookies: Vec<_> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }
}
