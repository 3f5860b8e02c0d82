use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::media::MediaFile;
use crate::store::{Document, Fields};

/// Post domain model - a catalog entry with its media
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "tags_from_list_or_string")]
    pub category_tags: Vec<String>,
    #[serde(default)]
    pub size: String,
    /// Two-decimal string, e.g. "12.50"
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub content: String,
    /// Display order; the first entry doubles as default thumbnail
    #[serde(default)]
    pub media: Vec<String>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub created_at: String,
}

// Older documents stored the tags as one comma-joined string.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<String>),
    Joined(String),
}

fn tags_from_list_or_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TagsRepr>::deserialize(deserializer)? {
        Some(TagsRepr::List(tags)) => tags,
        Some(TagsRepr::Joined(joined)) => normalize_tags(joined.split(',')),
        None => Vec::new(),
    })
}

impl Post {
    pub fn from_document(document: Document) -> CatalogResult<Self> {
        let mut fields = document.fields;
        fields.insert("id".to_string(), Value::String(document.id));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| CatalogError::Decode(format!("post: {}", e)))
    }

    /// Stored fields; the id lives in the document key.
    pub fn to_fields(&self) -> CatalogResult<Fields> {
        match serde_json::to_value(self).map_err(|e| CatalogError::Decode(e.to_string()))? {
            Value::Object(mut fields) => {
                fields.remove("id");
                Ok(fields)
            }
            _ => Err(CatalogError::Decode("post is not an object".to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CreatePostPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category_tags: Vec<String>,
    #[serde(default)]
    pub size: String,
    /// Appended to `size`, e.g. "cm"
    #[serde(default)]
    pub size_unit: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub content: String,
    /// Index into `media` of the chosen thumbnail
    pub thumbnail_index: Option<usize>,
    #[serde(default)]
    pub media: Vec<MediaFile>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePostPayload {
    pub name: Option<String>,
    pub category_tags: Option<Vec<String>>,
    pub size: Option<String>,
    pub weight: Option<String>,
    pub content: Option<String>,
    /// Must be one of the post's media after the edit
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub remove_media: Vec<String>,
    /// New files, appended after the existing media
    #[serde(default)]
    pub media: Vec<MediaFile>,
}

/// Parse a weight and fix it to two decimals.
pub fn normalize_weight(raw: &str) -> CatalogResult<String> {
    match raw.trim().parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight > 0.0 => Ok(format!("{:.2}", weight)),
        _ => Err(CatalogError::Validation(
            "Please enter a valid weight.".to_string(),
        )),
    }
}

/// Trimmed, non-empty, first occurrence wins.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weight_is_fixed_to_two_decimals() {
        assert_eq!(normalize_weight("12").unwrap(), "12.00");
        assert_eq!(normalize_weight(" 3.456 ").unwrap(), "3.46");
    }

    #[test]
    fn non_positive_or_garbage_weight_is_rejected() {
        for raw in ["0", "-1", "abc", "", "NaN", "inf"] {
            let err = normalize_weight(raw).unwrap_err();
            assert_eq!(err.to_string(), "Please enter a valid weight.", "input {raw:?}");
        }
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(normalize_tags([" A", "B ", "", "A"]), vec!["A", "B"]);
    }

    #[test]
    fn decodes_legacy_joined_tags() {
        let doc = Document {
            id: "p1".into(),
            fields: json!({"name": "Ring", "category_tags": "ring, gold"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let post = Post::from_document(doc).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.category_tags, vec!["ring", "gold"]);
        assert!(post.media.is_empty());
    }

    #[test]
    fn fields_exclude_the_id() {
        let post = Post {
            id: "p1".into(),
            name: "Ring".into(),
            category_tags: vec!["A".into()],
            size: "3cm".into(),
            weight: "1.00".into(),
            content: String::new(),
            media: vec!["https://m.test/a.png".into()],
            thumbnail: "https://m.test/a.png".into(),
            created_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let fields = post.to_fields().unwrap();
        assert!(!fields.contains_key("id"));
        let back = Post::from_document(Document { id: "p1".into(), fields }).unwrap();
        assert_eq!(back, post);
    }
}
