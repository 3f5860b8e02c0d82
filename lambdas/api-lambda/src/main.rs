mod http_handler;

use std::sync::Arc;

use catalog_shared::{AppConfig, AppState};
use lambda_http::{run, service_fn, Error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds its own timestamps
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting catalog API: backend={:?}, table={}, page_size={}",
        config.backend,
        config.table_name,
        config.page_size
    );
    let state = Arc::new(AppState::from_config(config).await?);

    run(service_fn(move |event| {
        let state = state.clone();
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
