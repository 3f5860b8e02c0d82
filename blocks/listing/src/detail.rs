use catalog_atoms::media::MediaKind;
use catalog_atoms::posts::Post;

use crate::html::{display, escape};

/// Post detail view-model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub title: String,
    pub main_media: MainMedia,
    /// Media after the first, in display order.
    pub gallery: Vec<String>,
    pub info: Vec<(&'static str, String)>,
    pub admin_controls_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainMedia {
    /// Autoplays muted and loops, with controls.
    Video(String),
    Image(String),
    Missing,
}

impl MainMedia {
    fn from_url(url: &str) -> Self {
        match MediaKind::from_url(url) {
            MediaKind::Video => MainMedia::Video(url.to_string()),
            MediaKind::Image => MainMedia::Image(url.to_string()),
        }
    }
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

impl DetailView {
    pub fn for_post(post: &Post, is_admin: bool) -> Self {
        let title = if post.name.trim().is_empty() {
            "No Product Name".to_string()
        } else {
            post.name.clone()
        };
        let main_media = post
            .media
            .first()
            .map(|url| MainMedia::from_url(url))
            .unwrap_or(MainMedia::Missing);
        let weight = if post.weight.trim().is_empty() {
            "N/A".to_string()
        } else {
            format!("{}g", post.weight)
        };
        let content = if post.content.trim().is_empty() {
            "No content available".to_string()
        } else {
            post.content.clone()
        };

        DetailView {
            title,
            main_media,
            gallery: post.media.iter().skip(1).cloned().collect(),
            info: vec![
                ("Product Name", or_na(&post.name)),
                ("Type", or_na(&post.category_tags.join(", "))),
                ("Size", or_na(&post.size)),
                ("Weight", weight),
                ("Content", content),
            ],
            admin_controls_visible: is_admin,
        }
    }

    /// View for an id with no post behind it.
    pub fn not_found() -> Self {
        Self::message("Post Not Found")
    }

    pub fn failed() -> Self {
        Self::message("Error loading post")
    }

    fn message(title: &str) -> Self {
        DetailView {
            title: title.to_string(),
            main_media: MainMedia::Missing,
            gallery: Vec::new(),
            info: Vec::new(),
            admin_controls_visible: false,
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = format!("<h1 id=\"post-name\">{}</h1>\n", escape(&self.title));

        html.push_str("<div id=\"main-media-container\">");
        match &self.main_media {
            MainMedia::Video(src) => html.push_str(&format!(
                "<video src=\"{}\" controls autoplay loop muted style=\"width: 80%\"></video>",
                escape(src)
            )),
            MainMedia::Image(src) => html.push_str(&format!(
                "<img src=\"{}\" alt=\"Main media image\" style=\"width: 60%\">",
                escape(src)
            )),
            MainMedia::Missing if !self.info.is_empty() => html.push_str("<p>No media available</p>"),
            MainMedia::Missing => {}
        }
        html.push_str("</div>\n");

        html.push_str("<div id=\"thumbnail-gallery\">");
        for (i, src) in self.gallery.iter().enumerate() {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"Thumbnail {}\" style=\"cursor: pointer\">",
                escape(src),
                i + 1
            ));
        }
        html.push_str("</div>\n");

        html.push_str("<section id=\"post-info\">\n");
        for (label, value) in &self.info {
            html.push_str(&format!(
                "  <p><strong>{}:</strong> {}</p>\n",
                label,
                escape(value)
            ));
        }
        html.push_str("</section>\n");

        let admin = display(self.admin_controls_visible);
        html.push_str(&format!(
            "<button id=\"edit-btn\" class=\"admin-only\" style=\"display: {}\">Edit</button>\n",
            admin
        ));
        html.push_str(&format!(
            "<button id=\"delete-btn\" class=\"admin-only\" style=\"display: {}\">Delete</button>\n",
            admin
        ));
        html
    }
}
