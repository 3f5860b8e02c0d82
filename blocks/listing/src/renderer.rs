use catalog_atoms::media::MediaKind;
use catalog_atoms::posts::Post;

use crate::page_loader::Page;

/// Shown for posts without a thumbnail.
pub const PLACEHOLDER_THUMBNAIL: &str = "default-thumbnail.png";
pub const NO_POSTS_MESSAGE: &str = "No posts available";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load posts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// Played inline with controls.
    Video { src: String },
    Image { src: String, alt: String },
}

/// One grid cell: a thumbnail that navigates to the post's detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub post_id: String,
    pub thumbnail: Thumbnail,
    pub detail_href: String,
}

impl CatalogItem {
    pub fn from_post(post: &Post) -> Self {
        let src = if post.thumbnail.trim().is_empty() {
            PLACEHOLDER_THUMBNAIL.to_string()
        } else {
            post.thumbnail.clone()
        };
        let thumbnail = match MediaKind::from_url(&src) {
            MediaKind::Video => Thumbnail::Video { src },
            MediaKind::Image => Thumbnail::Image {
                src,
                alt: format!("Thumbnail for post {}", post.name),
            },
        };
        CatalogItem {
            post_id: post.id.clone(),
            thumbnail,
            detail_href: detail_href(&post.id),
        }
    }
}

pub fn detail_href(post_id: &str) -> String {
    format!("/posts/{}/detail", post_id)
}

/// Display surface for a listing. Regions are bound once by the implementor.
pub trait CatalogView {
    /// Drop everything in the listing region.
    fn clear(&mut self);
    fn show_placeholder(&mut self, message: &str);
    fn push_item(&mut self, item: CatalogItem);
    fn set_next_page_visible(&mut self, visible: bool);
}

/// Redraw the listing region from scratch for `page`.
pub fn render<V: CatalogView + ?Sized>(view: &mut V, page: &Page) {
    view.clear();
    if page.items.is_empty() {
        view.show_placeholder(NO_POSTS_MESSAGE);
    }
    for post in &page.items {
        view.push_item(CatalogItem::from_post(post));
    }
    view.set_next_page_visible(page.has_more);
}

/// Replace the listing with the failure placeholder and hide paging.
pub fn render_failure<V: CatalogView + ?Sized>(view: &mut V) {
    view.clear();
    view.show_placeholder(LOAD_FAILED_MESSAGE);
    view.set_next_page_visible(false);
}
