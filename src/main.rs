use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use catalog_auth::config::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let config = AuthConfig::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "catalog_auth",
        "catalog-auth starting: RUST_LOG='{}', http_addr={}, session_ttl_secs={}, hash={:?}, sweep_interval_secs={}",
        rust_log, config.http_addr, config.session_ttl_secs, config.hash, config.sweep_interval_secs
    );

    catalog_auth::server::run(config).await
}
