use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamfinder_api::{
    api::{create_router, AppState},
    config::Config,
    models::Catalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streamfinder_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let catalog = Catalog::load(&config.services_path, &config.leagues_path)
        .context("Failed to load catalog")?;

    let state = AppState::new(catalog, &config);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!(
        address = %address,
        exhaustive_service_limit = config.exhaustive_service_limit,
        telemetry_enabled = config.telemetry_enabled,
        "Server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
