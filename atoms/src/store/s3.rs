use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use super::ObjectStore;
use crate::error::{CatalogError, CatalogResult};

/// Media bucket; objects are addressed publicly as `{base_url}/{key}`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket_name: String,
    base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket_name: &str, base_url: &str) -> Self {
        Self {
            client,
            bucket_name: bucket_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Object key behind a public URL of this bucket.
    fn key_for(&self, url: &str) -> CatalogResult<String> {
        if let Some(key) = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return Ok(key.to_string());
        }
        match parse_bucket_and_key(url) {
            Some((bucket, key)) if bucket == self.bucket_name => Ok(key),
            _ => Err(CatalogError::ObjectStore(format!(
                "{} is not an object of bucket {}",
                url, self.bucket_name
            ))),
        }
    }
}

// Parse bucket and key from an S3 URL like https://bucket.s3.amazonaws.com/key or https://s3.<region>.amazonaws.com/bucket/key
fn parse_bucket_and_key(url: &str) -> Option<(String, String)> {
    let no_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let (host, path) = no_scheme.split_once('/')?;
    let path = path.split(['?', '#']).next().unwrap_or(path);

    if host.starts_with("s3.") {
        let (bucket, key) = path.split_once('/')?;
        Some((bucket.to_string(), key.to_string()))
    } else if host.contains(".s3") {
        Some((host.split(".s3").next()?.to_string(), path.to_string()))
    } else {
        None
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> CatalogResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 put_object failed for key {}: {}", key, e);
                CatalogError::ObjectStore(format!("S3 upload failed: {}", e))
            })?;

        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn delete(&self, url: &str) -> CatalogResult<()> {
        let key = self.key_for(url)?;
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 delete_object failed for key {}: {}", key, e);
                CatalogError::ObjectStore(format!("S3 delete failed: {}", e))
            })?;
        Ok(())
    }
}
