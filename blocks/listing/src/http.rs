use std::num::NonZeroUsize;

use catalog_atoms::http::{error_response, html_response, json_response};
use catalog_atoms::posts::{get_post, Post};
use catalog_atoms::store::{Cursor, DocumentStore};
use catalog_atoms::{CatalogError, CatalogResult};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use crate::detail::DetailView;
use crate::page_loader::fetch_page;
use crate::query_builder::{build, QuerySpec};

/// Body of `GET /posts`.
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub items: Vec<Post>,
    pub has_more: bool,
    /// Pass back as `cursor` for the following page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One page of posts without server-side session state.
pub async fn list_posts(
    docs: &dyn DocumentStore,
    filter: &QuerySpec,
    cursor_token: Option<&str>,
    page_size: NonZeroUsize,
) -> CatalogResult<PostListResponse> {
    let mut query = build(filter, page_size);
    if let Some(token) = cursor_token.filter(|t| !t.is_empty()) {
        query = query.continue_after(Cursor::decode_for(token, &query)?);
    }

    let (page, cursor) = fetch_page(docs, &query, page_size).await?;
    let next_cursor = if page.has_more {
        cursor.map(|c| c.encode_for(&query))
    } else {
        None
    };

    Ok(PostListResponse {
        items: page.items,
        has_more: page.has_more,
        next_cursor,
    })
}

/// HTTP Handler: GET /posts?search=&category=&cursor=
pub async fn list_posts_handler(
    docs: &dyn DocumentStore,
    search: Option<&str>,
    category: Option<&str>,
    cursor_token: Option<&str>,
    page_size: usize,
) -> Result<Response<Body>, Error> {
    let page_size = match NonZeroUsize::new(page_size) {
        Some(size) => size,
        None => {
            return error_response(&CatalogError::QueryBuild(
                "page size must be positive".to_string(),
            ))
        }
    };
    let filter = QuerySpec::from_inputs(search, category);
    tracing::info!("📄 list_posts_handler: filter={:?}, cursor={:?}", filter, cursor_token);

    match list_posts(docs, &filter, cursor_token, page_size).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: GET /posts/{id}/detail
pub async fn post_detail_handler(
    docs: &dyn DocumentStore,
    post_id: &str,
    is_admin: bool,
) -> Result<Response<Body>, Error> {
    let (status, view) = match get_post(docs, post_id).await {
        Ok(post) => (StatusCode::OK, DetailView::for_post(&post, is_admin)),
        Err(CatalogError::NotFound(_)) => (StatusCode::NOT_FOUND, DetailView::not_found()),
        Err(e) => {
            tracing::error!("Error loading post {}: {}", post_id, e);
            (e.status_code(), DetailView::failed())
        }
    };
    html_response(status, view.to_html())
}
