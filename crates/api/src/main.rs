use std::sync::Arc;

use anyhow::Context;

use catalog_api::app::{build_app, services};
use catalog_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let settings = Settings::load().context("failed to load configuration")?;
    let bind_address = settings.bind_address();

    let services = Arc::new(services::build_services(settings).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
