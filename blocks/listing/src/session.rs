use std::sync::Arc;

use catalog_atoms::store::DocumentStore;
use catalog_atoms::{CatalogError, CatalogResult};

use crate::page_loader::{LoaderPhase, PageLoader};
use crate::query_builder::QuerySpec;
use crate::renderer::{render, render_failure};
use crate::view::{DashboardView, HtmlDashboard};

/// One visitor's dashboard: the filter inputs, pagination state and the
/// view it paints. UI events map to the async methods below.
pub struct CatalogSession<V: DashboardView = HtmlDashboard> {
    loader: PageLoader,
    view: V,
    search: String,
    category: String,
}

impl CatalogSession<HtmlDashboard> {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> CatalogResult<Self> {
        Self::with_view(store, page_size, HtmlDashboard::new())
    }
}

impl<V: DashboardView> CatalogSession<V> {
    pub fn with_view(store: Arc<dyn DocumentStore>, page_size: usize, view: V) -> CatalogResult<Self> {
        Ok(Self {
            loader: PageLoader::new(store, page_size)?,
            view,
            search: String::new(),
            category: String::new(),
        })
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn phase(&self) -> LoaderPhase {
        self.loader.phase()
    }

    /// Filter the current inputs select.
    pub fn filter(&self) -> QuerySpec {
        QuerySpec::from_inputs(Some(&self.search), Some(&self.category))
    }

    pub fn set_admin(&mut self, is_admin: bool) {
        self.view.set_admin_controls_visible(is_admin);
    }

    /// Page load: first page for the current inputs.
    pub async fn open(&mut self) {
        self.refresh(false).await;
    }

    /// Keystroke in the search box.
    pub async fn search(&mut self, term: &str) {
        self.search = term.trim().to_string();
        self.refresh(false).await;
    }

    /// Category filter change; `None` or "all" clears it.
    pub async fn select_category(&mut self, tag: Option<&str>) {
        self.category = tag.unwrap_or_default().trim().to_string();
        self.refresh(false).await;
    }

    /// Replace both inputs at once and restart at the first page.
    pub async fn apply_filters(&mut self, search: Option<&str>, category: Option<&str>) {
        self.search = search.unwrap_or_default().trim().to_string();
        self.category = category.unwrap_or_default().trim().to_string();
        self.refresh(false).await;
    }

    /// "Next page" control.
    pub async fn next_page(&mut self) {
        self.refresh(true).await;
    }

    async fn refresh(&mut self, advance: bool) {
        let filter = self.filter();
        match self.loader.load_page(filter, advance).await {
            Ok(page) => render(&mut self.view, &page),
            Err(CatalogError::StaleResponseDiscarded) => {}
            Err(e) => {
                tracing::warn!("Failed to load posts: {}", e);
                render_failure(&mut self.view);
            }
        }
    }
}
