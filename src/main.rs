use inquiso::routes::create_app;
use inquiso::{AppConfig, AppState};
use tokio::net::TcpListener;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Inquiso server...");

    // Load configuration from environment
    let config = AppConfig::from_env();
    info!("Server configuration loaded");

    let app_state = AppState::new(config.clone()).await?;
    info!("Application state initialized ({} storage)", app_state.db.backend_name());

    let app = create_app(app_state);

    let listener = TcpListener::bind(config.server_address()).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
