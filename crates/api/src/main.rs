use anyhow::Context;

use civicdesk_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("invalid configuration")?;
    civicdesk_observability::init(&config.log);

    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    tracing::info!(environment = ?config.environment, "starting civicdesk api");

    let app = civicdesk_api::app::build_app(&config)
        .await
        .context("failed to initialize services")?;

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
