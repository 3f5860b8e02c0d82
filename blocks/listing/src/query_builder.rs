use std::num::NonZeroUsize;

use catalog_atoms::posts::POSTS_COLLECTION;
use catalog_atoms::store::{Predicate, Query};

pub const NAME_FIELD: &str = "name";
pub const CATEGORY_FIELD: &str = "category_tags";

/// Appended to a search term to close the prefix range.
pub const PREFIX_RANGE_END: char = '\u{FFFF}';

/// Category value the filter control uses for "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Which posts the listing shows. Category and search never combine; a
/// search term supersedes the selected category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuerySpec {
    #[default]
    All,
    Category(String),
    /// Name prefix, already trimmed and non-empty.
    Search(String),
}

impl QuerySpec {
    pub fn category(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.is_empty() || tag == ALL_CATEGORIES {
            QuerySpec::All
        } else {
            QuerySpec::Category(tag.to_string())
        }
    }

    pub fn search(term: &str) -> Self {
        let term = term.trim();
        if term.is_empty() {
            QuerySpec::All
        } else {
            QuerySpec::Search(term.to_string())
        }
    }

    /// Combine the two UI inputs.
    pub fn from_inputs(search: Option<&str>, category: Option<&str>) -> Self {
        match QuerySpec::search(search.unwrap_or_default()) {
            QuerySpec::All => QuerySpec::category(category.unwrap_or_default()),
            spec => spec,
        }
    }
}

/// Translate a filter into a store query returning at most `page_size` posts.
pub fn build(spec: &QuerySpec, page_size: NonZeroUsize) -> Query {
    let query = Query::new(POSTS_COLLECTION, page_size.get());
    match spec {
        QuerySpec::All => query,
        QuerySpec::Category(tag) => query.with_predicate(Predicate::Contains {
            field: CATEGORY_FIELD.to_string(),
            value: tag.clone(),
        }),
        QuerySpec::Search(term) => query.with_predicate(Predicate::Range {
            field: NAME_FIELD.to_string(),
            start: term.clone(),
            end: format!("{}{}", term, PREFIX_RANGE_END),
        }),
    }
}
