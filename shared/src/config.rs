use std::str::FromStr;

use catalog_atoms::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// DynamoDB, S3 and Cognito
    Dynamo,
    /// Everything in process; local runs
    Memory,
}

impl FromStr for StoreBackend {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamo" => Ok(StoreBackend::Dynamo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(CatalogError::Config(format!("unknown STORE_BACKEND '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Enables immediate confirmation of accounts created through signup.
    pub user_pool_id: Option<String>,
}

/// Settings read once per cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub table_name: String,
    pub bucket_name: String,
    pub media_base_url: String,
    /// Always present for the dynamo backend.
    pub cognito: Option<CognitoSettings>,
    pub page_size: usize,
    pub backend: StoreBackend,
    pub cors_origin: String,
    pub login_email_domain: String,
    pub session_capacity: usize,
}

fn positive(name: &str, raw: Option<String>, default: usize) -> CatalogResult<usize> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CatalogError::Config(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

impl AppConfig {
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CatalogResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Dynamo,
        };
        let bucket_name = var("S3_BUCKET_NAME").unwrap_or_else(|| "catalog-media".to_string());
        let media_base_url = var("MEDIA_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket_name));

        let cognito = match (var("COGNITO_CLIENT_ID"), var("COGNITO_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(CognitoSettings {
                client_id,
                client_secret,
                user_pool_id: var("COGNITO_USER_POOL_ID"),
            }),
            _ if backend == StoreBackend::Dynamo => {
                return Err(CatalogError::Config(
                    "COGNITO_CLIENT_ID and COGNITO_CLIENT_SECRET must be set".to_string(),
                ))
            }
            _ => None,
        };

        Ok(AppConfig {
            table_name: var("TABLE_NAME").unwrap_or_else(|| "catalog".to_string()),
            bucket_name,
            media_base_url: media_base_url.trim_end_matches('/').to_string(),
            cognito,
            page_size: positive("PAGE_SIZE", var("PAGE_SIZE"), 2)?,
            backend,
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| "*".to_string()),
            login_email_domain: var("LOGIN_EMAIL_DOMAIN").unwrap_or_else(|| "example.com".to_string()),
            session_capacity: positive("SESSION_CAPACITY", var("SESSION_CAPACITY"), 1024)?,
        })
    }

    /// Defaults for the in-process backend.
    pub fn local() -> Self {
        AppConfig {
            table_name: "catalog".to_string(),
            bucket_name: "catalog-media".to_string(),
            media_base_url: "http://localhost/media".to_string(),
            cognito: None,
            page_size: 2,
            backend: StoreBackend::Memory,
            cors_origin: "*".to_string(),
            login_email_domain: "example.com".to_string(),
            session_capacity: 1024,
        }
    }
}
