use crate::html::{display, escape};
use crate::renderer::{CatalogItem, CatalogView, Thumbnail};

/// Dashboard chrome beyond the listing itself.
pub trait DashboardView: CatalogView {
    /// Upload and signup controls.
    fn set_admin_controls_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GridContent {
    Placeholder(String),
    Items(Vec<CatalogItem>),
}

/// Dashboard view-model rendered to an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDashboard {
    grid: GridContent,
    next_page_visible: bool,
    admin_controls_visible: bool,
}

impl Default for HtmlDashboard {
    fn default() -> Self {
        Self {
            grid: GridContent::Items(Vec::new()),
            next_page_visible: false,
            admin_controls_visible: false,
        }
    }
}

impl HtmlDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CatalogItem] {
        match &self.grid {
            GridContent::Items(items) => items,
            GridContent::Placeholder(_) => &[],
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        match &self.grid {
            GridContent::Placeholder(message) => Some(message),
            GridContent::Items(_) => None,
        }
    }

    pub fn next_page_visible(&self) -> bool {
        self.next_page_visible
    }

    pub fn admin_controls_visible(&self) -> bool {
        self.admin_controls_visible
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<div id=\"post-grid\">\n");
        match &self.grid {
            GridContent::Placeholder(message) => {
                html.push_str(&format!("  <p>{}</p>\n", escape(message)));
            }
            GridContent::Items(items) => {
                for item in items {
                    html.push_str(&item_html(item));
                }
            }
        }
        html.push_str("</div>\n");
        html.push_str(&format!(
            "<button id=\"next-page-btn\" hx-get=\"/dashboard/next\" style=\"display: {}\">Next</button>\n",
            display(self.next_page_visible)
        ));
        let admin = display(self.admin_controls_visible);
        html.push_str(&format!(
            "<a id=\"upload-btn\" href=\"/upload.html\" style=\"display: {}\">Upload</a>\n",
            admin
        ));
        html.push_str(&format!(
            "<a id=\"signup-btn\" href=\"/signup.html\" style=\"display: {}\">Sign up</a>\n",
            admin
        ));
        html
    }
}

fn item_html(item: &CatalogItem) -> String {
    let media = match &item.thumbnail {
        Thumbnail::Video { src } => format!(
            "<video src=\"{}\" controls style=\"width: 100%\"></video>",
            escape(src)
        ),
        Thumbnail::Image { src, alt } => {
            format!("<img src=\"{}\" alt=\"{}\">", escape(src), escape(alt))
        }
    };
    format!(
        "  <a class=\"post-item\" data-post-id=\"{}\" href=\"{}\">{}</a>\n",
        escape(&item.post_id),
        escape(&item.detail_href),
        media
    )
}

impl CatalogView for HtmlDashboard {
    fn clear(&mut self) {
        self.grid = GridContent::Items(Vec::new());
    }

    fn show_placeholder(&mut self, message: &str) {
        self.grid = GridContent::Placeholder(message.to_string());
    }

    fn push_item(&mut self, item: CatalogItem) {
        if let GridContent::Items(items) = &mut self.grid {
            items.push(item);
            return;
        }
        self.grid = GridContent::Items(vec![item]);
    }

    fn set_next_page_visible(&mut self, visible: bool) {
        self.next_page_visible = visible;
    }
}

impl DashboardView for HtmlDashboard {
    fn set_admin_controls_visible(&mut self, visible: bool) {
        self.admin_controls_visible = visible;
    }
}
