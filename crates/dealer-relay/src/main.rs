use dealer_relay::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Defaults to info when RUST_LOG is unset.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = serve().await {
        tracing::error!(error = %e, "dealer relay failed");
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), RelayError> {
    let config = RelayConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        dealer = %config.endpoints.dealer,
        subscribe_notifications = config.bootstrap.subscribe_notifications,
        track_playback = config.bootstrap.track_playback,
        "starting dealer relay"
    );

    let cache = RedisCredentialCache::connect(&config.redis_url).await?;
    let metadata = HttpTrackMetadata::new(reqwest::Client::new(), config.endpoints.api.clone());

    let server = RelayServer::builder(config).build(cache, metadata).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await
}
