use anyhow::Context;

use market_infra::MarketConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    market_observability::init();

    let config = MarketConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let services = market_api::app::services::build_services(&config)
        .await
        .context("failed to initialise storage")?;
    let app = market_api::app::build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
