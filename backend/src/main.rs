mod analytics;
mod config;
mod error;
mod routes;

use perceptive_shared::config::LOADER_WASM;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::ServerError;
use routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("perceptive_backend=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        retain = config.analytics_retain,
        "Perceptive AI backend starting"
    );
    if !config.static_dir.join(LOADER_WASM).exists() {
        tracing::warn!("{LOADER_WASM} not found in static dir; run host-loader/build.sh");
    }

    let state = AppState::new(config.analytics_retain);
    let app = build_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
