use std::net::SocketAddr;
use std::process;

use tracing_subscriber::EnvFilter;

use forecast_service::{config::Settings, create_router, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("forecast_service=debug,tower_http=info")),
        )
        .init();

    // API credentials live in config.env; missing keys degrade individual
    // providers rather than blocking startup.
    dotenvy::from_filename("config.env").ok();
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();
    if settings.anthropic_api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set; analysis generation will be unavailable");
    }

    let state = match AppState::from_settings(settings.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application state: {e}");
            eprintln!("Error: failed to initialize application state: {e}");
            process::exit(1);
        }
    };

    let app = create_router(state);

    let addr = match format!("{}:{}", settings.host, settings.port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(
                "Invalid host:port combination {}:{}: {e}",
                settings.host,
                settings.port
            );
            eprintln!("Error: invalid host:port combination: {e}");
            process::exit(1);
        }
    };

    tracing::info!("Forecast service listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            eprintln!("Error: failed to bind to {addr}: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        eprintln!("Server error: {e}");
        process::exit(1);
    }
}
