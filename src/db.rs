use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::Client;

use crate::config::AppConfig;

/// Build a pooled client from the configured URI. The client connects
/// lazily, so failures show up on the first operation rather than
/// here.
pub async fn connect(config: &AppConfig) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.max_idle_time = Some(std::time::Duration::from_millis(config.max_idle_time_ms));
    options.connect_timeout = Some(std::time::Duration::from_millis(config.connect_timeout_ms));
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    let client = Client::with_options(options)?;
    tracing::debug!(uri = %config.mongodb_uri, "MongoDB client configured");
    Ok(client)
}
