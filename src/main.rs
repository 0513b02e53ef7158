use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sqlshift::config::Config;
use sqlshift::routes;
use sqlshift::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sqlshift=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::discover();
    config.apply_env_overrides()?;
    let addr = config.bind_address();

    // Initialize app state
    let app_state = AppState::new(config)?;
    let app = routes::app(app_state);

    info!("Starting server on {}", addr);
    info!("   POST /convert        - Convert a single statement");
    info!("   POST /convert-batch  - Convert uploaded files into a ZIP");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
