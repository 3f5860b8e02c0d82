//! Catalog listing: filter-to-query translation, cursor pagination with
//! stale-response protection, and rendering of result pages into typed
//! view-models (dashboard grid and post detail).

pub mod detail;
pub mod html;
pub mod http;
pub mod page_loader;
pub mod query_builder;
pub mod renderer;
pub mod session;
pub mod view;

pub use detail::{DetailView, MainMedia};
pub use http::{list_posts, list_posts_handler, post_detail_handler, PostListResponse};
pub use page_loader::{fetch_page, LoaderPhase, Page, PageLoader};
pub use query_builder::{build, QuerySpec};
pub use renderer::{render, render_failure, CatalogItem, CatalogView, Thumbnail};
pub use session::CatalogSession;
pub use view::{DashboardView, HtmlDashboard};
