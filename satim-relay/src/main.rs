use anyhow::Context;
use satim_relay::{build_router, AppState, RelayConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RelayConfig::from_env().context("Failed to load relay configuration")?;
    info!(config = ?config, "Loaded relay configuration");
    let addr = config.listen_addr()?;

    let state = AppState::from_config(config)?;
    let app = build_router(state);

    info!(%addr, "starting satim-relay");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
