//! Process-local stores for local runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{new_document_id, Document, DocumentStore, Fields, ObjectStore, Query};
use crate::error::{CatalogError, CatalogResult};

/// Documents kept per collection in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<Document>>) -> T,
    ) -> CatalogResult<T> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| CatalogError::StoreRead("memory store poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn execute(&self, query: &Query) -> CatalogResult<Vec<Document>> {
        self.with_collections(|collections| {
            let Some(docs) = collections.get(&query.collection) else {
                return Vec::new();
            };
            let start = match &query.start_after {
                None => 0,
                Some(cursor) => {
                    let id = cursor.document_id();
                    match docs.iter().position(|d| d.id == id) {
                        Some(pos) => pos + 1,
                        // cursor document deleted meanwhile; ids are time ordered
                        None => docs.iter().take_while(|d| d.id.as_str() <= id).count(),
                    }
                }
            };
            docs[start..]
                .iter()
                .filter(|d| query.matches(&d.fields))
                .take(query.limit)
                .cloned()
                .collect()
        })
    }

    async fn get(&self, collection: &str, id: &str) -> CatalogResult<Option<Document>> {
        self.with_collections(|collections| {
            collections
                .get(collection)
                .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
        })
    }

    async fn insert(&self, collection: &str, fields: Fields) -> CatalogResult<Document> {
        let document = Document {
            id: new_document_id(),
            fields,
        };
        self.with_collections(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .push(document.clone());
        })?;
        Ok(document)
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        self.with_collections(|collections| {
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|d| d.id == id) {
                Some(existing) => existing.fields = fields,
                None => docs.push(Document {
                    id: id.to_string(),
                    fields,
                }),
            }
        })
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        self.with_collections(|collections| {
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| CatalogError::NotFound(format!("{} not found", id)))?;
            existing.fields.extend(fields);
            Ok(())
        })?
    }

    async fn delete(&self, collection: &str, id: &str) -> CatalogResult<()> {
        self.with_collections(|collections| {
            if let Some(docs) = collections.get_mut(collection) {
                docs.retain(|d| d.id != id);
            }
        })
    }
}

/// Objects kept in a map keyed by URL.
#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(url))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> CatalogResult<String> {
        let url = format!("{}/{}", self.base_url, key);
        self.objects
            .lock()
            .map_err(|_| CatalogError::ObjectStore("memory store poisoned".to_string()))?
            .insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> CatalogResult<()> {
        self.objects
            .lock()
            .map_err(|_| CatalogError::ObjectStore("memory store poisoned".to_string()))?
            .remove(url);
        Ok(())
    }
}
