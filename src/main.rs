use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toptier::api::{create_routes, AppServices};
use toptier::config::{run_migrations, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level)),
        )
        .init();

    let pool = settings
        .database
        .create_pool()
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    let services = AppServices::from_settings(pool, &settings).await?;
    if services.youtube.videos_are_mocked() || services.youtube.performance_is_mocked() {
        info!("YouTube / Google Ads credentials missing, marketing analytics use mock data");
    }

    let app = create_routes(services);

    let address = settings.app.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!(
        "Top Tier API ({}) listening on http://{}",
        settings.app.environment, address
    );
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
