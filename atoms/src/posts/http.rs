use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::de::DeserializeOwned;

use super::model::{CreatePostPayload, UpdatePostPayload};
use super::service::{create_post, delete_post, get_post, migrate_legacy_tags, update_post};
use crate::error::{CatalogError, CatalogResult};
use crate::http::{error_response, no_content, respond};
use crate::store::{DocumentStore, ObjectStore};

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> CatalogResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| CatalogError::Validation(format!("Invalid request body: {}", e)))
}

/// HTTP Handler: GET /posts/{id}
pub async fn get_post_handler(
    docs: &dyn DocumentStore,
    post_id: &str,
) -> Result<Response<Body>, Error> {
    respond(StatusCode::OK, get_post(docs, post_id).await)
}

/// HTTP Handler: POST /posts
pub async fn create_post_handler(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreatePostPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };
    tracing::info!(
        "📥 create_post_handler: name={}, media_count={}",
        payload.name,
        payload.media.len()
    );
    respond(StatusCode::CREATED, create_post(docs, objects, payload).await)
}

/// HTTP Handler: PATCH /posts/{id}
pub async fn update_post_handler(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    post_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdatePostPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };
    respond(StatusCode::OK, update_post(docs, objects, post_id, payload).await)
}

/// HTTP Handler: DELETE /posts/{id}
pub async fn delete_post_handler(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    post_id: &str,
) -> Result<Response<Body>, Error> {
    match delete_post(docs, objects, post_id).await {
        Ok(()) => no_content(),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: POST /posts/migrate-tags
pub async fn migrate_tags_handler(docs: &dyn DocumentStore) -> Result<Response<Body>, Error> {
    let result = migrate_legacy_tags(docs)
        .await
        .map(|migrated| serde_json::json!({ "migrated": migrated }));
    respond(StatusCode::OK, result)
}
