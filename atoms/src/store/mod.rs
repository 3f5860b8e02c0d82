//! Storage capabilities the catalog is written against.
//!
//! The document store holds JSON-shaped documents grouped in collections and
//! answers [`Query`] values: plain data describing predicates, a result cap
//! and an optional position to continue after. The object store holds the
//! binary media files and hands back public URLs.

pub mod dynamo;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, CatalogResult};

pub use dynamo::DynamoDocumentStore;
pub use memory::{MemoryDocumentStore, MemoryObjectStore};
pub use s3::S3ObjectStore;

pub type Fields = Map<String, Value>;

/// A stored document: the store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Position after the last document of a fetched page.
///
/// Only meaningful together with the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    pub fn after(document: &Document) -> Self {
        Cursor(document.id.clone())
    }

    pub(crate) fn document_id(&self) -> &str {
        &self.0
    }

    /// Opaque token handed to API clients, bound to the query it continues.
    pub fn encode_for(&self, query: &Query) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}.{}", query.fingerprint(), self.0))
    }

    /// Decode a client token. Tokens issued for a different query are
    /// rejected.
    pub fn decode_for(token: &str, query: &Query) -> CatalogResult<Self> {
        let invalid = || CatalogError::Validation("Invalid cursor".to_string());
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        let payload = String::from_utf8(bytes).map_err(|_| invalid())?;
        match payload.split_once('.') {
            Some((fingerprint, id)) if fingerprint == query.fingerprint() && !id.is_empty() => {
                Ok(Cursor(id.to_string()))
            }
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// List or set field has `value` as a member. String fields never
    /// match, on any backend.
    Contains { field: String, value: String },
    /// String field lies in `[start, end)`.
    Range { field: String, start: String, end: String },
    Equals { field: String, value: String },
}

impl Predicate {
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Predicate::Contains { field, value } => match fields.get(field) {
                Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value.as_str())),
                _ => false,
            },
            Predicate::Range { field, start, end } => fields
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s >= start.as_str() && s < end.as_str())
                .unwrap_or(false),
            Predicate::Equals { field, value } => {
                fields.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub limit: usize,
    pub start_after: Option<Cursor>,
}

impl Query {
    pub fn new(collection: &str, limit: usize) -> Self {
        Self {
            collection: collection.to_string(),
            predicates: Vec::new(),
            limit,
            start_after: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Same query, resuming after `cursor`.
    pub fn continue_after(&self, cursor: Cursor) -> Self {
        Self {
            start_after: Some(cursor),
            ..self.clone()
        }
    }

    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.predicates.iter().all(|p| p.matches(fields))
    }

    /// Short digest of the collection and predicates. Limit and position
    /// are left out.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.collection.as_bytes());
        for predicate in &self.predicates {
            let parts = match predicate {
                Predicate::Contains { field, value } => {
                    ["contains", field.as_str(), value.as_str(), ""]
                }
                Predicate::Range { field, start, end } => {
                    ["range", field.as_str(), start.as_str(), end.as_str()]
                }
                Predicate::Equals { field, value } => ["equals", field.as_str(), value.as_str(), ""],
            };
            for part in parts {
                hasher.update([0u8]);
                hasher.update(part.as_bytes());
            }
        }
        hasher.finalize()[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Document database: query, read and write primitives.
///
/// `execute` returns documents in ascending id order, which is creation order
/// because ids are time ordered.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn execute(&self, query: &Query) -> CatalogResult<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> CatalogResult<Option<Document>>;

    /// Store a new document under a fresh id.
    async fn insert(&self, collection: &str, fields: Fields) -> CatalogResult<Document>;

    /// Create or replace the document with a caller-chosen id.
    async fn put(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> CatalogResult<()>;
}

/// Binary object storage for media files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> CatalogResult<String>;

    async fn delete(&self, url: &str) -> CatalogResult<()>;
}

/// Fresh time-ordered document id.
pub fn new_document_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
