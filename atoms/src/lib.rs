//! Domain atoms for the product catalog: posts, users, media and the
//! document/object store capabilities they are persisted through.

pub mod error;
pub mod http;
pub mod media;
pub mod posts;
pub mod store;
pub mod users;

pub use error::{CatalogError, CatalogResult};
