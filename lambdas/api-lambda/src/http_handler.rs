use std::sync::Arc;

use catalog_atoms::http::{error_response, html_response, method_not_allowed, not_found};
use catalog_atoms::posts::{
    create_post_handler, delete_post_handler, get_post_handler, migrate_tags_handler,
    update_post_handler,
};
use catalog_atoms::CatalogError;
use catalog_shared::auth::{self, AuthUser};
use catalog_shared::sessions::SESSION_COOKIE;
use catalog_shared::AppState;
use lambda_http::http::header::{HeaderValue, SET_COOKIE, VARY};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use listing_block::{list_posts_handler, post_detail_handler};

// visitor sessions live as long as the warm instance at most
const SESSION_COOKIE_MAX_AGE: i64 = 12 * 3600;

fn with_set_cookies(mut resp: Response<Body>, cookies: &[String]) -> Response<Body> {
    let headers = resp.headers_mut();
    for cookie in cookies {
        if let Ok(v) = HeaderValue::from_str(cookie) {
            headers.append(SET_COOKIE, v);
        }
    }
    resp
}

fn with_cors_headers(
    mut resp: Response<Body>,
    allowed_origin: &str,
    request_origin: Option<&str>,
) -> Response<Body> {
    let cors_origin = auth::cors_origin(allowed_origin, request_origin);

    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(&cors_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert("Access-Control-Allow-Credentials", HeaderValue::from_static("true"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization,Cookie,HX-Request"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

fn finalize_response(
    resp: Result<Response<Body>, Error>,
    allowed_origin: &str,
    request_origin: Option<&str>,
    cookies: &[String],
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(with_set_cookies(r, cookies), allowed_origin, request_origin))
}

fn query_param<'a>(event: &'a Request, name: &str) -> Option<&'a str> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
}

/// Dashboard grid for the visitor's session. `filters` restart pagination;
/// without them the next page is shown, or the first one when the session
/// had to be recreated.
async fn dashboard(
    state: &AppState,
    cookie_header: Option<&str>,
    user: Option<AuthUser>,
    filters: Option<(Option<&str>, Option<&str>)>,
    cookies: &mut Vec<String>,
) -> Result<Response<Body>, Error> {
    let session_id = auth::cookie_value(cookie_header, SESSION_COOKIE);
    let (id, visitor, created) =
        match state.sessions.get_or_create(session_id, || state.new_visitor()) {
            Ok(found) => found,
            Err(e) => return error_response(&e),
        };
    if created {
        cookies.push(auth::session_cookie(SESSION_COOKIE, &id, SESSION_COOKIE_MAX_AGE));
    }

    let mut visitor = visitor.lock().await;
    visitor.sync_user(user);
    match filters {
        Some((search, category)) => visitor.catalog.apply_filters(search, category).await,
        None if created => visitor.catalog.open().await,
        None => visitor.catalog.next_page().await,
    }
    html_response(StatusCode::OK, visitor.catalog.view().to_html())
}

/// Main Lambda handler - routes requests to auth, dashboard and post endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    let allowed_origin = state.config.cors_origin.as_str();
    let request_origin = event.headers().get("Origin").and_then(|v| v.to_str().ok());
    let cookie_header = event.headers().get("Cookie").and_then(|v| v.to_str().ok());
    tracing::info!("🚀 Catalog API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, allowed_origin, request_origin));
    }

    // Auth endpoints need no credentials
    if path == "/login" {
        let resp = match method {
            &Method::POST => {
                auth::http::login(
                    state.identity.as_ref(),
                    &state.config.login_email_domain,
                    body,
                )
                .await
            }
            _ => method_not_allowed(),
        };
        return finalize_response(resp, allowed_origin, request_origin, &[]);
    }

    if path == "/logout" {
        let resp = match method {
            &Method::POST => auth::http::logout(),
            _ => method_not_allowed(),
        };
        return finalize_response(resp, allowed_origin, request_origin, &[]);
    }

    let authorization = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());
    let token = auth::request_token(authorization, cookie_header);
    let mut cookies = Vec::new();
    let user = match auth::authenticate(state.identity.as_ref(), state.docs.as_ref(), token).await {
        Ok(user) => user,
        Err(CatalogError::Unauthorized) => {
            // stale cookie: carry on anonymously and drop it
            tracing::info!("Ignoring rejected access token");
            cookies.push(auth::clear_cookie(auth::ACCESS_TOKEN_COOKIE));
            None
        }
        Err(e) => {
            // identity or profile lookup failed; gated routes still reject
            tracing::warn!("Authentication unavailable, continuing anonymously: {}", e);
            None
        }
    };

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        (&Method::POST, ["signup"]) => match auth::require_admin(user.as_ref()) {
            Ok(_) => {
                auth::http::signup(
                    state.identity.as_ref(),
                    state.docs.as_ref(),
                    &state.config.login_email_domain,
                    body,
                )
                .await
            }
            Err(e) => error_response(&e),
        },
        (&Method::GET, ["users", "me"]) => match auth::require_user(user.as_ref()) {
            Ok(user) => auth::http::current_user(state.docs.as_ref(), user).await,
            Err(e) => error_response(&e),
        },

        (&Method::GET, ["dashboard"]) => {
            let filters = (query_param(&event, "search"), query_param(&event, "category"));
            dashboard(&state, cookie_header, user, Some(filters), &mut cookies).await
        }
        (&Method::GET, ["dashboard", "next"]) => {
            dashboard(&state, cookie_header, user, None, &mut cookies).await
        }

        (&Method::GET, ["posts"]) => {
            list_posts_handler(
                state.docs.as_ref(),
                query_param(&event, "search"),
                query_param(&event, "category"),
                query_param(&event, "cursor"),
                state.config.page_size,
            )
            .await
        }
        (&Method::POST, ["posts"]) => match auth::require_admin(user.as_ref()) {
            Ok(_) => create_post_handler(state.docs.as_ref(), state.objects.as_ref(), body).await,
            Err(e) => error_response(&e),
        },
        (&Method::POST, ["posts", "migrate-tags"]) => match auth::require_admin(user.as_ref()) {
            Ok(_) => migrate_tags_handler(state.docs.as_ref()).await,
            Err(e) => error_response(&e),
        },
        (&Method::GET, ["posts", post_id]) => get_post_handler(state.docs.as_ref(), post_id).await,
        (&Method::GET, ["posts", post_id, "detail"]) => {
            let is_admin = user.as_ref().map(|u| u.is_admin).unwrap_or(false);
            post_detail_handler(state.docs.as_ref(), post_id, is_admin).await
        }
        (&Method::PATCH, ["posts", post_id]) => match auth::require_admin(user.as_ref()) {
            Ok(_) => {
                update_post_handler(state.docs.as_ref(), state.objects.as_ref(), post_id, body)
                    .await
            }
            Err(e) => error_response(&e),
        },
        (&Method::DELETE, ["posts", post_id]) => match auth::require_admin(user.as_ref()) {
            Ok(_) => delete_post_handler(state.docs.as_ref(), state.objects.as_ref(), post_id).await,
            Err(e) => error_response(&e),
        },

        (_, ["signup"]) | (_, ["users", "me"]) | (_, ["dashboard", ..]) | (_, ["posts", ..]) => {
            method_not_allowed()
        }
        _ => not_found(),
    };

    finalize_response(resp, allowed_origin, request_origin, &cookies)
}
