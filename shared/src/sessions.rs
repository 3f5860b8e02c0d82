//! Visitor dashboard sessions kept in the warm instance.

use std::sync::Arc;

use catalog_atoms::store::DocumentStore;
use catalog_atoms::CatalogResult;
use listing_block::CatalogSession;
use mini_moka::sync::Cache;
use tokio::sync::Mutex as AsyncMutex;

use crate::auth::{AuthProvider, AuthUser, SessionAuth};

pub const SESSION_COOKIE: &str = "catalog_session";

/// One visitor: their listing state and who they are signed in as.
pub struct Visitor {
    pub catalog: CatalogSession,
    pub auth: SessionAuth,
}

impl Visitor {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> CatalogResult<Self> {
        Ok(Self {
            catalog: CatalogSession::new(store, page_size)?,
            auth: SessionAuth::new(),
        })
    }

    /// Adopt the user the current request authenticated as; admin chrome
    /// follows the cached user.
    pub fn sync_user(&mut self, user: Option<AuthUser>) {
        if self.auth.update(user) {
            let is_admin = self.auth.current_user().map(|u| u.is_admin).unwrap_or(false);
            self.catalog.set_admin(is_admin);
        }
    }
}

pub type SharedVisitor = Arc<AsyncMutex<Visitor>>;

/// Bounded cache of visitor sessions. Once full, the cache evicts the
/// entries least likely to be used again.
pub struct VisitorSessions {
    visitors: Cache<String, SharedVisitor>,
}

impl VisitorSessions {
    pub fn new(capacity: usize) -> Self {
        Self {
            visitors: Cache::builder().max_capacity(capacity.max(1) as u64).build(),
        }
    }

    /// Approximate until pending maintenance has run.
    pub fn len(&self) -> u64 {
        self.visitors.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Session for `id`, or a fresh one from `create` under a new id when
    /// the id is missing or was evicted. Returns the id to hand back.
    pub fn get_or_create(
        &self,
        id: Option<&str>,
        create: impl FnOnce() -> CatalogResult<Visitor>,
    ) -> CatalogResult<(String, SharedVisitor, bool)> {
        if let Some(id) = id {
            if let Some(visitor) = self.visitors.get(&id.to_string()) {
                return Ok((id.to_string(), visitor, false));
            }
            tracing::debug!("Visitor session {} not found, starting a new one", id);
        }

        let visitor = Arc::new(AsyncMutex::new(create()?));
        let id = uuid::Uuid::new_v4().to_string();
        self.visitors.insert(id.clone(), visitor.clone());
        Ok((id, visitor, true))
    }
}
