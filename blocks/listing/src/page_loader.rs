use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use catalog_atoms::posts::Post;
use catalog_atoms::store::{Cursor, DocumentStore, Query};
use catalog_atoms::{CatalogError, CatalogResult};
use serde::Serialize;

use crate::query_builder::{build, QuerySpec};

/// One bounded batch of posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Post>,
    /// A further page exists for the same filter.
    pub has_more: bool,
}

impl Page {
    pub fn empty() -> Self {
        Page {
            items: Vec::new(),
            has_more: false,
        }
    }
}

/// Run `query` for one page. Returns the page and the cursor after its last item.
///
/// One extra document is requested so a page that exactly fills `page_size`
/// still knows whether anything follows.
pub async fn fetch_page(
    store: &dyn DocumentStore,
    query: &Query,
    page_size: NonZeroUsize,
) -> CatalogResult<(Page, Option<Cursor>)> {
    let page_size = page_size.get();
    let mut documents = store.execute(&query.with_limit(page_size + 1)).await?;

    let has_more = documents.len() > page_size;
    documents.truncate(page_size);
    let cursor = documents.last().map(Cursor::after);

    let items = documents
        .into_iter()
        .map(Post::from_document)
        .collect::<CatalogResult<Vec<_>>>()?;

    Ok((Page { items, has_more }, cursor))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    /// Filter set, nothing loaded under it yet.
    Idle,
    /// Last load returned a full page with more behind it.
    Paged,
    /// Last load returned a short or empty page.
    Exhausted,
}

#[derive(Debug)]
struct LoaderState {
    active: QuerySpec,
    cursor: Option<Cursor>,
    last_query: Option<Query>,
    phase: LoaderPhase,
    // bumped for every issued request; only the newest may apply its result
    generation: u64,
}

/// Pagination state for one listing.
///
/// Loads may overlap; a response is applied only when no newer request was
/// issued in the meantime, older ones resolve to
/// [`CatalogError::StaleResponseDiscarded`].
pub struct PageLoader {
    store: Arc<dyn DocumentStore>,
    page_size: NonZeroUsize,
    state: Mutex<LoaderState>,
}

impl PageLoader {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> CatalogResult<Self> {
        let page_size = NonZeroUsize::new(page_size)
            .ok_or_else(|| CatalogError::QueryBuild("page size must be positive".to_string()))?;
        Ok(Self {
            store,
            page_size,
            state: Mutex::new(LoaderState {
                active: QuerySpec::All,
                cursor: None,
                last_query: None,
                phase: LoaderPhase::Idle,
                generation: 0,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        // plain data, always consistent between statements
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn phase(&self) -> LoaderPhase {
        self.state().phase
    }

    pub fn active_filter(&self) -> QuerySpec {
        self.state().active.clone()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.state().cursor.clone()
    }

    /// Load the first page for `filter`, or with `advance` the page after the
    /// current cursor. Changing the filter always restarts at the first page;
    /// the new filter becomes active once its first page has loaded.
    pub async fn load_page(&self, filter: QuerySpec, advance: bool) -> CatalogResult<Page> {
        let (generation, query) = {
            let mut state = self.state();
            state.generation += 1;

            let query = match (advance, state.active == filter, &state.cursor, &state.last_query) {
                (true, true, Some(cursor), Some(last)) => last.continue_after(cursor.clone()),
                _ => build(&filter, self.page_size),
            };
            (state.generation, query)
        };

        let result = fetch_page(self.store.as_ref(), &query, self.page_size).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(
                "Discarding page for {:?}: request {} superseded by {}",
                filter,
                generation,
                state.generation
            );
            return Err(CatalogError::StaleResponseDiscarded);
        }

        // a failed load leaves filter, cursor and phase as they were
        let (page, cursor) = result?;
        if state.active != filter {
            state.active = filter;
            state.cursor = None;
        }
        match cursor {
            Some(cursor) => state.cursor = Some(cursor),
            // an empty continuation leaves the position where it was
            None if query.start_after.is_some() => {}
            None => state.cursor = None,
        }
        state.last_query = Some(query);
        state.phase = if page.has_more {
            LoaderPhase::Paged
        } else {
            LoaderPhase::Exhausted
        };

        Ok(page)
    }
}
