use std::sync::Arc;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use catalog_atoms::store::{
    DocumentStore, DynamoDocumentStore, MemoryDocumentStore, MemoryObjectStore, ObjectStore,
    S3ObjectStore,
};
use catalog_atoms::{CatalogError, CatalogResult};

use crate::auth::{CognitoIdentityProvider, IdentityProvider, MemoryIdentityProvider};
use crate::config::{AppConfig, StoreBackend};
use crate::sessions::{Visitor, VisitorSessions};

/// Everything a request handler needs; built once per cold start.
pub struct AppState {
    pub config: AppConfig,
    pub docs: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: VisitorSessions,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        docs: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = VisitorSessions::new(config.session_capacity);
        Self {
            config,
            docs,
            objects,
            identity,
            sessions,
        }
    }

    /// In-process stores and accounts.
    pub fn in_memory(config: AppConfig) -> Self {
        let objects = Arc::new(MemoryObjectStore::new(&config.media_base_url));
        Self::new(
            config,
            Arc::new(MemoryDocumentStore::new()),
            objects,
            Arc::new(MemoryIdentityProvider::new()),
        )
    }

    /// Wire the configured backend.
    pub async fn from_config(config: AppConfig) -> CatalogResult<Self> {
        match config.backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory stores; data is lost when the instance stops");
                Ok(Self::in_memory(config))
            }
            StoreBackend::Dynamo => {
                let cognito = config.cognito.clone().ok_or_else(|| {
                    CatalogError::Config("Cognito settings missing".to_string())
                })?;
                let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

                let docs = DynamoDocumentStore::new(DynamoClient::new(&aws), &config.table_name);
                let objects = S3ObjectStore::new(
                    S3Client::new(&aws),
                    &config.bucket_name,
                    &config.media_base_url,
                );
                let identity = CognitoIdentityProvider::new(CognitoClient::new(&aws), cognito);
                Ok(Self::new(
                    config,
                    Arc::new(docs),
                    Arc::new(objects),
                    Arc::new(identity),
                ))
            }
        }
    }

    pub fn new_visitor(&self) -> CatalogResult<Visitor> {
        Visitor::new(self.docs.clone(), self.config.page_size)
    }
}
