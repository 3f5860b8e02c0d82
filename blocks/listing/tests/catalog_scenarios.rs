use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use catalog_atoms::posts::POSTS_COLLECTION;
use catalog_atoms::store::{
    Document, DocumentStore, Fields, MemoryDocumentStore, Predicate, Query,
};
use catalog_atoms::{CatalogError, CatalogResult};
use listing_block::{render, CatalogSession, HtmlDashboard, LoaderPhase, PageLoader, QuerySpec};
use serde_json::json;
use tokio::sync::Notify;

/// Memory store that can be told to fail reads, and can hold back queries
/// for one search term until released.
#[derive(Default)]
struct ScriptedStore {
    inner: MemoryDocumentStore,
    failing: AtomicBool,
    held_term: Option<String>,
    parked: Notify,
    release: Notify,
}

impl ScriptedStore {
    fn holding(term: &str) -> Self {
        Self {
            held_term: Some(term.to_string()),
            ..Self::default()
        }
    }

    async fn post(&self, name: &str, tags: &[&str]) {
        let fields = json!({ "name": name, "category_tags": tags, "thumbnail": "t.png" });
        self.inner
            .insert(POSTS_COLLECTION, fields.as_object().cloned().unwrap())
            .await
            .unwrap();
    }

    fn is_held(&self, query: &Query) -> bool {
        query.predicates.iter().any(|p| match (p, &self.held_term) {
            (Predicate::Range { start, .. }, Some(term)) => start == term,
            _ => false,
        })
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn execute(&self, query: &Query) -> CatalogResult<Vec<Document>> {
        if self.is_held(query) {
            self.parked.notify_one();
            self.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::StoreRead("connection reset".into()));
        }
        self.inner.execute(query).await
    }

    async fn get(&self, collection: &str, id: &str) -> CatalogResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: &str, fields: Fields) -> CatalogResult<Document> {
        self.inner.insert(collection, fields).await
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        self.inner.put(collection, id, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> CatalogResult<()> {
        self.inner.delete(collection, id).await
    }
}

async fn catalog(names: &[&str]) -> Arc<ScriptedStore> {
    let store = ScriptedStore::default();
    for name in names {
        store.post(name, &[]).await;
    }
    Arc::new(store)
}

fn names(items: &[catalog_atoms::posts::Post]) -> Vec<&str> {
    items.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn new_filter_never_reuses_old_cursor() {
    let loader = PageLoader::new(catalog(&["Alpha", "Alphabet", "Beta", "Bravo"]).await, 1).unwrap();
    loader.load_page(QuerySpec::All, false).await.unwrap();
    loader.load_page(QuerySpec::All, true).await.unwrap();

    let page = loader.load_page(QuerySpec::search("B"), false).await.unwrap();
    assert_eq!(names(&page.items), ["Beta"]);
    let page = loader.load_page(QuerySpec::search("Alph"), false).await.unwrap();
    assert_eq!(names(&page.items), ["Alpha"]);
    assert_eq!(loader.active_filter(), QuerySpec::search("Alph"));
}

#[tokio::test]
async fn first_page_is_idempotent() {
    let loader = PageLoader::new(catalog(&["a", "b", "c"]).await, 2).unwrap();
    let first = loader.load_page(QuerySpec::All, false).await.unwrap();
    for _ in 0..3 {
        assert_eq!(loader.load_page(QuerySpec::All, false).await.unwrap(), first);
    }
}

#[tokio::test]
async fn advancing_terminates() {
    let loader = PageLoader::new(catalog(&["a", "b", "c", "d", "e", "f", "g"]).await, 3).unwrap();
    let mut page = loader.load_page(QuerySpec::All, false).await.unwrap();
    let mut loads = 1;
    while page.has_more {
        page = loader.load_page(QuerySpec::All, true).await.unwrap();
        loads += 1;
        assert!(loads <= 3, "pagination did not terminate");
    }
    assert_eq!(loader.phase(), LoaderPhase::Exhausted);
}

#[tokio::test]
async fn short_page_has_no_more() {
    let loader = PageLoader::new(catalog(&["a", "b"]).await, 3).unwrap();
    let page = loader.load_page(QuerySpec::All, false).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_more);
}

#[tokio::test]
async fn late_response_for_old_filter_is_dropped() {
    let store = ScriptedStore::holding("Alph");
    for name in ["Alpha", "Alphabet", "Beta"] {
        store.post(name, &[]).await;
    }
    let store = Arc::new(store);
    let loader = PageLoader::new(store.clone(), 5).unwrap();
    let mut view = HtmlDashboard::new();
    let mut completed = Vec::new();

    let (old, new) = tokio::join!(
        loader.load_page(QuerySpec::search("Alph"), false),
        async {
            store.parked.notified().await;
            let result = loader.load_page(QuerySpec::search("Beta"), false).await;
            store.release.notify_one();
            result
        }
    );
    // the newer load finished first; the older one resumed afterwards
    completed.push(new);
    completed.push(old);
    for result in &completed {
        if let Ok(page) = result {
            render(&mut view, page);
        }
    }

    assert_eq!(completed[1], Err(CatalogError::StaleResponseDiscarded));
    assert_eq!(loader.active_filter(), QuerySpec::search("Beta"));
    assert_eq!(view.items().len(), 1);
    assert!(view.to_html().contains("Thumbnail for post Beta"));
}

#[tokio::test]
async fn empty_catalog_shows_placeholder() {
    let mut session = CatalogSession::new(catalog(&[]).await, 2).unwrap();
    session.open().await;
    assert_eq!(session.view().placeholder(), Some("No posts available"));
    assert!(!session.view().next_page_visible());
}

#[tokio::test]
async fn exact_page_size_catalog() {
    let loader = PageLoader::new(catalog(&["a", "b"]).await, 2).unwrap();
    let page = loader.load_page(QuerySpec::All, false).await.unwrap();
    assert_eq!(names(&page.items), ["a", "b"]);
    assert!(!page.has_more);
}

#[tokio::test]
async fn multi_page_catalog() {
    let loader = PageLoader::new(catalog(&["a", "b", "c", "d", "e"]).await, 2).unwrap();

    let mut sizes = Vec::new();
    let mut more = Vec::new();
    let page = loader.load_page(QuerySpec::All, false).await.unwrap();
    sizes.push(page.items.len());
    more.push(page.has_more);
    for _ in 0..2 {
        let page = loader.load_page(QuerySpec::All, true).await.unwrap();
        sizes.push(page.items.len());
        more.push(page.has_more);
    }
    assert_eq!(sizes, [2, 2, 1]);
    assert_eq!(more, [true, true, false]);

    let page = loader.load_page(QuerySpec::All, true).await.unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn category_filter_keeps_relative_order() {
    let store = ScriptedStore::default();
    store.post("first", &["A"]).await;
    store.post("second", &["B"]).await;
    store.post("third", &["A", "B"]).await;
    let loader = PageLoader::new(Arc::new(store), 5).unwrap();

    let page = loader.load_page(QuerySpec::category("A"), false).await.unwrap();
    assert_eq!(names(&page.items), ["first", "third"]);
}

#[tokio::test]
async fn search_is_a_name_prefix() {
    let loader = PageLoader::new(catalog(&["Alpha", "Alphabet", "Beta"]).await, 5).unwrap();
    let page = loader.load_page(QuerySpec::search("  Alph "), false).await.unwrap();
    assert_eq!(names(&page.items), ["Alpha", "Alphabet"]);
}

#[tokio::test]
async fn store_failure_is_visible_and_leaves_state_alone() {
    let store = catalog(&["a", "b", "c"]).await;
    let mut session = CatalogSession::new(store.clone(), 2).unwrap();
    session.open().await;
    assert_eq!(session.phase(), LoaderPhase::Paged);

    store.failing.store(true, Ordering::SeqCst);
    session.next_page().await;
    assert_eq!(session.view().placeholder(), Some("Failed to load posts"));
    assert!(!session.view().next_page_visible());
    assert_eq!(session.phase(), LoaderPhase::Paged);

    // retry picks up where the successful load left off
    store.failing.store(false, Ordering::SeqCst);
    session.next_page().await;
    let ids: Vec<_> = session.view().items().iter().map(|i| i.post_id.clone()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(session.phase(), LoaderPhase::Exhausted);
}

#[tokio::test]
async fn failed_filter_change_keeps_previous_filter() {
    let store = catalog(&["Alpha", "Beta"]).await;
    let loader = PageLoader::new(store.clone(), 1).unwrap();
    loader.load_page(QuerySpec::All, false).await.unwrap();
    let cursor = loader.cursor();

    store.failing.store(true, Ordering::SeqCst);
    let err = loader.load_page(QuerySpec::search("Beta"), false).await.unwrap_err();
    assert!(matches!(err, CatalogError::StoreRead(_)));
    assert_eq!(loader.active_filter(), QuerySpec::All);
    assert_eq!(loader.cursor(), cursor);
}
