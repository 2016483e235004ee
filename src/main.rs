//! Service entrypoint: configuration, storage, and the HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use dhc_api::publisher::LoggingPublisher;
use dhc_api::{epr::ReqwestEprTransport, router, AppState, Config};
use dhc_store::PgMessageStore;
use dhc_trustomer::{TrustomerCache, TrustomerClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    PgMessageStore::migrate(&pool)
        .await
        .context("running migrations")?;

    let trustomer_client = TrustomerClient::new(
        &config.trustomer_api_host,
        &config.customer_code,
        &config.trustomer_api_key,
    )
    .context("building trustomer client")?;
    let trustomer = Arc::new(TrustomerCache::new(
        trustomer_client,
        config.trustomer_cache_ttl,
    ));

    let listen_address = config.listen_address.clone();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(PgMessageStore::new(pool)),
        Arc::new(LoggingPublisher),
        trustomer,
        Arc::new(ReqwestEprTransport::new().context("building EPR transport")?),
    ));

    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("binding {listen_address}"))?;
    tracing::info!(%listen_address, "dhos-connector listening");

    axum::serve(listener, router(state))
        .await
        .context("serving")?;

    Ok(())
}
