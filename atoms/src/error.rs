use lambda_http::http::StatusCode;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Every failure the catalog can surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A filter could not be turned into a store query.
    #[error("Invalid query: {0}")]
    QueryBuild(String),

    #[error("Document store read failed: {0}")]
    StoreRead(String),

    #[error("Document store write failed: {0}")]
    StoreWrite(String),

    #[error("Object store failed: {0}")]
    ObjectStore(String),

    /// A page response arrived after a newer request was issued. Never shown
    /// to the user; callers drop it.
    #[error("Stale response discarded")]
    StaleResponseDiscarded,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Identity provider rejected a login or signup; the message is user facing.
    #[error("{0}")]
    Auth(String),

    #[error("Malformed document: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::QueryBuild(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::StoreRead(_) | Self::StoreWrite(_) | Self::ObjectStore(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::StaleResponseDiscarded | Self::Decode(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
